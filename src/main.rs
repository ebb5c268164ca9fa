#[cfg(not(feature = "cli"))]
compile_error!("The `sqcarve` binary requires the `cli` feature. Build with `--features cli`.");

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;

use sqcarve::cli::app::Cli;
use sqcarve::cli::carve::{self, CarveOptions};

fn main() {
    // Help and version leave with status 0; anything else the parser
    // rejects (unknown switch, missing input) is a usage error.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    let opts = CarveOptions {
        file: cli.input,
        verbose: cli.verbose,
        debug: cli.debug,
        cellcount_min: cli.cellcount_min,
        cellcount_max: cli.cellcount_max,
        rowsize_min: cli.rowsize_min,
        rowsize_max: cli.rowsize_max.unwrap_or(u64::MAX),
        page_size: cli.page_size,
        page_start: cli.page_start.unwrap_or(0),
        page_end: cli.page_end.unwrap_or(0),
        report_blobs: !cli.no_blobs,
        blob_size_limit: cli.blob_size_limit.unwrap_or(u64::MAX),
        fine_search: cli.fine_search,
        freespace_only: cli.freespace,
        freespace_minimum: cli.freespace_minimum,
        removed_only: cli.removed_only,
        blob_dir: PathBuf::from("."),
    };

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    if let Err(e) = carve::execute(&opts, &mut writer) {
        let _ = writer.flush();
        eprintln!("{} {}", "error:".red().bold(), e);
        process::exit(1);
    }
}
