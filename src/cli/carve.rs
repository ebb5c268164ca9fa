//! The carving command: open, scan, emit.

use std::io::Write;
use std::path::PathBuf;

use colored::Colorize;

use crate::cli::wprintln;
use crate::sqlite::header::DbHeader;
use crate::sqlite::image::Image;
use crate::sqlite::render::{Emitter, RenderConfig};
use crate::sqlite::scan::{ScanConfig, Scanner};
use crate::CarveError;

/// Options for a carve run, assembled from the parsed command line.
pub struct CarveOptions {
    /// Path to the input database image.
    pub file: String,
    /// Verbose diagnostics (header summary, scan summary).
    pub verbose: bool,
    /// Debug diagnostics (per-page and free-block dumps).
    pub debug: bool,
    /// Inclusive cell-count acceptance window.
    pub cellcount_min: usize,
    pub cellcount_max: usize,
    /// Inclusive declared-payload-size acceptance window.
    pub rowsize_min: u64,
    pub rowsize_max: u64,
    /// Override the header's page size.
    pub page_size: Option<u32>,
    /// Clamp the 1-based page sweep; 0 = unbounded.
    pub page_start: u32,
    pub page_end: u32,
    /// Emit BLOB cells at all.
    pub report_blobs: bool,
    /// BLOBs at or above this size go to sidecar files.
    pub blob_size_limit: u64,
    /// Advance one byte after a match instead of one record.
    pub fine_search: bool,
    /// Scan free-block spans instead of emitting normal records.
    pub freespace_only: bool,
    /// Skip free-block spans smaller than this.
    pub freespace_minimum: u32,
    /// Emit only rows reconstructed from free-block spans.
    pub removed_only: bool,
    /// Directory receiving `N.blob` sidecar files.
    pub blob_dir: PathBuf,
}

/// Scan the image and write recovered rows to `writer`.
pub fn execute(opts: &CarveOptions, writer: &mut dyn Write) -> Result<(), CarveError> {
    let image = Image::open(&opts.file)?;
    if image.is_empty() {
        // Nothing to recover, and nothing to validate a header against.
        return Ok(());
    }

    let header = DbHeader::read(&image, opts.page_size)?;
    let page_count = header.effective_page_count(image.len());

    if opts.verbose {
        wprintln!(
            writer,
            "{} {} ({} bytes, page size {}, {} pages)",
            "Scanning".cyan(),
            opts.file,
            image.len(),
            header.page_size,
            page_count
        )?;
        wprintln!(
            writer,
            "Free list: head page {}, {} pages",
            header.freelist_head,
            header.freelist_pages
        )?;
    }

    let cfg = ScanConfig {
        cellcount_min: opts.cellcount_min,
        cellcount_max: opts.cellcount_max,
        rowsize_min: opts.rowsize_min,
        rowsize_max: opts.rowsize_max,
        fine_search: opts.fine_search,
        freespace_only: opts.freespace_only,
        freespace_minimum: opts.freespace_minimum,
        removed_only: opts.removed_only,
        page_start: opts.page_start,
        page_end: opts.page_end,
        verbose: opts.verbose,
        debug: opts.debug,
        ..ScanConfig::for_image(header.page_size, page_count)
    };
    let render = RenderConfig {
        report_blobs: opts.report_blobs,
        blob_size_limit: opts.blob_size_limit,
        blob_dir: opts.blob_dir.clone(),
    };

    let mut emitter = Emitter::new(writer, render);
    let summary = Scanner::new(&image, &cfg).run(&mut emitter)?;

    if opts.verbose {
        wprintln!(
            emitter.out(),
            "{} {} pages ({} leaf), {} rows, {} free-space rows, {} blob files",
            "Scanned".cyan(),
            summary.pages_scanned,
            summary.leaf_pages,
            summary.rows_emitted,
            summary.freeblock_rows,
            summary.blob_files
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn options(path: &str) -> CarveOptions {
        CarveOptions {
            file: path.to_string(),
            verbose: false,
            debug: false,
            cellcount_min: 2,
            cellcount_max: 1000,
            rowsize_min: 10,
            rowsize_max: u64::MAX,
            page_size: None,
            page_start: 0,
            page_end: 0,
            report_blobs: true,
            blob_size_limit: u64::MAX,
            fine_search: false,
            freespace_only: false,
            freespace_minimum: 0,
            removed_only: false,
            blob_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_empty_file_succeeds_with_no_output() {
        let tmp = NamedTempFile::new().unwrap();
        let mut out = Vec::new();
        execute(&options(tmp.path().to_str().unwrap()), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let mut out = Vec::new();
        assert!(execute(&options("/no/such/image.db"), &mut out).is_err());
    }

    #[test]
    fn test_short_file_is_fatal() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 64]).unwrap();
        tmp.flush().unwrap();
        let mut out = Vec::new();
        assert!(execute(&options(tmp.path().to_str().unwrap()), &mut out).is_err());
    }
}
