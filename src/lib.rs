//! Forensic record carver for SQLite database images.
//!
//! The `sqlite-carve` crate (library name `sqcarve`) recovers row records
//! from SQLite database files by scanning the raw byte image, without using
//! the file's B-tree indexes, catalog, or journal. The input is treated as
//! an untrusted byte blob: rows are accepted only when the cell encoding is
//! self-consistent, which lets the scanner pull back rows that are still
//! live, rows that were deleted but linger in page free blocks, and rows on
//! pages the database no longer references.
//!
//! # CLI Reference
//!
//! The `sqcarve` binary takes one input file and emits recovered rows as
//! comma-separated values on stdout, one row per line:
//!
//! ```text
//! sqcarve -i damaged.db > rows.csv
//! sqcarve -i damaged.db --freespace            # deleted rows only
//! sqcarve -i damaged.db --page-size=4096       # header is trashed
//! sqcarve -i damaged.db --blob-size-limit=4096 # spill large blobs to N.blob
//! ```
//!
//! | Switch | Purpose |
//! |--------|---------|
//! | `-i FILE` | input database image (required) |
//! | `-v` / `-d` | verbose / debug diagnostics |
//! | `--cellcount-min/-max` | accept rows by cell count (defaults 2, 1000) |
//! | `--rowsize-min/-max` | accept rows by declared payload size (default min 10) |
//! | `--page-size` | override the header's page size |
//! | `--page-start/--page-end` | clamp the scanned page range |
//! | `--fine-search` | advance one byte after a match instead of one record |
//! | `--freespace` | scan page free blocks instead of live cell areas |
//! | `--freespace-minimum` | skip free blocks smaller than N bytes |
//! | `--removed-only` | emit only rows recovered from free blocks |
//! | `--no-blobs` / `--blob-size-limit` | BLOB cell handling |
//!
//! # Library API
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`Image`](sqlite::image::Image) | Read-only, bounds-checked view of the file bytes |
//! | [`DbHeader`](sqlite::header::DbHeader) | Page size / page count / free-list fields from the file prefix |
//! | [`LeafHeader`](sqlite::page::LeafHeader) | Leaf table page header and free-block chain |
//! | [`decode_row`](sqlite::record::decode_row) | Validate and decode one candidate record |
//! | [`Scanner`](sqlite::scan::Scanner) | Whole-file sweep driving decode and emission |
//! | [`Emitter`](sqlite::render::Emitter) | CSV rendering and sidecar blob files |
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`sqlite::varint`] | 1–9 byte big-endian variable-length integers |
//! | [`sqlite::image`] | Memory-mapped input file |
//! | [`sqlite::header`] | 100-byte file header fields |
//! | [`sqlite::page`] | Leaf table pages and free-block chains |
//! | [`sqlite::record`] | Serial types, cell headers, overflow chains |
//! | [`sqlite::render`] | Payload materialization and CSV output |
//! | [`sqlite::scan`] | Page walker and row scanner |

#[cfg(feature = "cli")]
pub mod cli;
pub mod sqlite;
pub mod util;

use thiserror::Error;

/// Errors returned by `sqcarve` operations.
#[derive(Error, Debug)]
pub enum CarveError {
    /// An I/O error occurred (file open, read, or write failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// The input image is unusable (illegal page size, truncated file).
    #[error("Format error: {0}")]
    Format(String),

    /// An invalid argument was supplied (out-of-range option value).
    #[error("Invalid argument: {0}")]
    Argument(String),
}
