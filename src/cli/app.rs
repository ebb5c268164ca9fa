// Shared between the library (`cli::app`) and `build.rs`, which pulls this
// file in via `include!()` to generate the man page and shell completions.
// Keep it free of crate-local imports.

use clap::Parser;

/// Recover live and deleted rows from a SQLite database image.
///
/// The input is scanned page by page as a raw byte blob; rows are written
/// to stdout as comma-separated values, one per line. No use is made of
/// the database's B-tree, catalog, or journal, so damaged and partially
/// overwritten files are fine.
#[derive(Parser)]
#[command(name = "sqcarve")]
#[command(version)]
#[command(about = "Forensic record carver for SQLite database images")]
pub struct Cli {
    /// Input database file
    #[arg(short = 'i', value_name = "FILE")]
    pub input: String,

    /// Enable verbose diagnostics
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Enable debug diagnostics (very large dumps)
    #[arg(short = 'd')]
    pub debug: bool,

    /// Minimum number of cells a row must have to be extracted
    #[arg(long = "cellcount-min", value_name = "COUNT", default_value_t = 2)]
    pub cellcount_min: usize,

    /// Maximum number of cells a row must have to be extracted
    #[arg(long = "cellcount-max", value_name = "COUNT", default_value_t = 1000)]
    pub cellcount_max: usize,

    /// Minimum number of payload bytes a row must have to be extracted
    #[arg(long = "rowsize-min", value_name = "BYTES", default_value_t = 10)]
    pub rowsize_min: u64,

    /// Maximum number of payload bytes a row must have to be extracted
    #[arg(long = "rowsize-max", value_name = "BYTES")]
    pub rowsize_max: Option<u64>,

    /// Hard-code the page size (useful when the header is damaged)
    #[arg(long = "page-size", value_name = "BYTES")]
    pub page_size: Option<u32>,

    /// First page to scan (1-based)
    #[arg(long = "page-start", value_name = "NUMBER")]
    pub page_start: Option<u32>,

    /// Last page to scan (1-based, inclusive)
    #[arg(long = "page-end", value_name = "NUMBER")]
    pub page_end: Option<u32>,

    /// Disable the dumping of BLOB data
    #[arg(long = "no-blobs")]
    pub no_blobs: bool,

    /// BLOBs at or above this size are dumped to .blob files
    #[arg(long = "blob-size-limit", value_name = "BYTES")]
    pub blob_size_limit: Option<u64>,

    /// Search shifting one byte at a time, rather than record by record
    #[arg(long = "fine-search")]
    pub fine_search: bool,

    /// Search for rows in page free space instead of live cell areas
    #[arg(long = "freespace")]
    pub freespace: bool,

    /// Smallest free-space span to search in
    #[arg(long = "freespace-minimum", value_name = "BYTES", default_value_t = 0)]
    pub freespace_minimum: u32,

    /// Dump only rows recovered without a key (from free space)
    #[arg(long = "removed-only")]
    pub removed_only: bool,
}
