//! The whole-file sweep.
//!
//! Pages are visited in file order. On each page the scanner seeds a
//! cursor (the page origin for normal records, the head free-block's data
//! for free-space recovery), asks [`decode_row`] whether a record starts
//! there, and on failure slides one byte forward. Successful decodes go to
//! the [`Emitter`]; the cursor then jumps the declared record length, or
//! keeps fine-stepping when `--fine-search` asked for overlapping hits.
//!
//! The sweep is deliberately indifferent to the B-tree: every page is
//! scanned whether or not anything links to it, which is how rows on
//! unlinked pages come back.

use crate::sqlite::constants::*;
use crate::sqlite::header::DbHeader;
use crate::sqlite::image::Image;
use crate::sqlite::page::{walk_freeblocks, LeafHeader};
use crate::sqlite::record::{decode_row, DecodeMode, RowMatch};
use crate::sqlite::render::Emitter;
use crate::util::hex::hex_dump;
use crate::CarveError;

/// Immutable configuration for one scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Page size in bytes.
    pub page_size: u32,
    /// Trusted page count (see [`DbHeader::effective_page_count`]).
    pub page_count: u32,
    /// Inclusive cell-count acceptance window.
    pub cellcount_min: usize,
    pub cellcount_max: usize,
    /// Inclusive declared-payload-size acceptance window.
    pub rowsize_min: u64,
    pub rowsize_max: u64,
    /// Advance one byte after a match instead of one record.
    pub fine_search: bool,
    /// Scan free-block spans instead of emitting normal records.
    pub freespace_only: bool,
    /// Skip free-block spans smaller than this.
    pub freespace_minimum: u32,
    /// Emit only rows reconstructed from free-block spans.
    pub removed_only: bool,
    /// First and last page to sweep, 1-based inclusive; 0 = unbounded.
    pub page_start: u32,
    pub page_end: u32,
    /// Diagnostic levels.
    pub verbose: bool,
    pub debug: bool,
}

impl ScanConfig {
    /// A config with default filters for the given geometry; callers
    /// adjust fields from there.
    pub fn for_image(page_size: u32, page_count: u32) -> Self {
        ScanConfig {
            page_size,
            page_count,
            cellcount_min: DEFAULT_CELLCOUNT_MIN,
            cellcount_max: DEFAULT_CELLCOUNT_MAX,
            rowsize_min: DEFAULT_ROWSIZE_MIN,
            rowsize_max: u64::MAX,
            fine_search: false,
            freespace_only: false,
            freespace_minimum: 0,
            removed_only: false,
            page_start: 0,
            page_end: 0,
            verbose: false,
            debug: false,
        }
    }

    /// Derive a config from a parsed header.
    pub fn from_header(header: &DbHeader, file_len: usize) -> Self {
        Self::for_image(header.page_size, header.effective_page_count(file_len))
    }
}

/// Counters reported after a scan under `-v`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanSummary {
    /// Pages visited by the sweep.
    pub pages_scanned: u32,
    /// Pages recognized as leaf table pages.
    pub leaf_pages: u32,
    /// Rows emitted from normal-mode decodes.
    pub rows_emitted: u64,
    /// Rows emitted from free-block spans.
    pub freeblock_rows: u64,
    /// Sidecar blob files written.
    pub blob_files: u32,
}

/// Drives the page walk over one image.
pub struct Scanner<'a> {
    image: &'a Image,
    cfg: &'a ScanConfig,
}

macro_rules! diag {
    ($em:expr, $($arg:tt)*) => {
        writeln!($em.out(), $($arg)*).map_err(|e| CarveError::Io(e.to_string()))
    };
}

impl<'a> Scanner<'a> {
    pub fn new(image: &'a Image, cfg: &'a ScanConfig) -> Self {
        Scanner { image, cfg }
    }

    /// Sweep every page in range and emit what survives validation.
    pub fn run(&self, emitter: &mut Emitter) -> Result<ScanSummary, CarveError> {
        let cfg = self.cfg;
        let ps = cfg.page_size as usize;
        let file_len = self.image.len();
        let mut summary = ScanSummary::default();

        let first = cfg.page_start.max(1);
        let last = if cfg.page_end == 0 {
            cfg.page_count
        } else {
            cfg.page_end.min(cfg.page_count)
        };

        for page_no in first..=last {
            let origin = (page_no as usize - 1) * ps;
            if origin >= file_len {
                break;
            }
            let window_end = (origin + ps).min(file_len);
            let page = &self.image.as_bytes()[origin..window_end];
            summary.pages_scanned += 1;

            let leaf = LeafHeader::parse(page);
            if leaf.is_some() {
                summary.leaf_pages += 1;
            }

            if cfg.debug {
                diag!(
                    emitter,
                    "-- page {} @ {} ({} bytes){}",
                    page_no,
                    origin,
                    window_end - origin,
                    if leaf.is_some() { ", leaf" } else { "" }
                )?;
            }

            if cfg.freespace_only {
                if let Some(block) = self.usable_freeblock(page, leaf, emitter)? {
                    let start = origin + block.0 as usize + FREEBLOCK_HEADER_SIZE;
                    self.find_rows(
                        start,
                        window_end,
                        DecodeMode::FreeBlock { span: block.1 },
                        emitter,
                        &mut summary,
                    )?;
                    continue;
                }
            }
            // Normal-mode sweep. In free-space mode it still runs on pages
            // without a usable free block, with emission suppressed.
            self.find_rows(origin, window_end, DecodeMode::Normal, emitter, &mut summary)?;
        }

        summary.blob_files = emitter.blob_files();
        Ok(summary)
    }

    /// The head free-block of a leaf page, as `(offset, size)`, when it
    /// clears the minimum-span filter. The rest of the chain is only
    /// reported.
    fn usable_freeblock(
        &self,
        page: &[u8],
        leaf: Option<LeafHeader>,
        emitter: &mut Emitter,
    ) -> Result<Option<(u16, u16)>, CarveError> {
        let leaf = match leaf {
            Some(l) if l.freeblock_offset > 0 => l,
            _ => return Ok(None),
        };
        let blocks = walk_freeblocks(page, leaf.freeblock_offset);
        if self.cfg.debug {
            for b in &blocks {
                diag!(
                    emitter,
                    "   freeblock @ {}: {} bytes, next {}",
                    b.offset,
                    b.size,
                    b.next
                )?;
                let o = b.offset as usize + FREEBLOCK_HEADER_SIZE;
                let span = (b.size as usize).saturating_sub(FREEBLOCK_HEADER_SIZE);
                if let Some(data) = page.get(o..(o + span).min(page.len())) {
                    diag!(emitter, "{}", hex_dump(&data[..data.len().min(32)], o as u64))?;
                }
            }
        }
        let head = match blocks.first() {
            Some(b) if b.size > 0 => *b,
            _ => return Ok(None),
        };
        if u32::from(head.size) < self.cfg.freespace_minimum {
            return Ok(None);
        }
        Ok(Some((head.offset, head.size)))
    }

    /// Slide a cursor through `[start, window_end)` looking for records.
    fn find_rows(
        &self,
        start: usize,
        window_end: usize,
        mode: DecodeMode,
        emitter: &mut Emitter,
        summary: &mut ScanSummary,
    ) -> Result<(), CarveError> {
        let cfg = self.cfg;
        let ps = cfg.page_size as usize;
        let mut p = start;
        let mut mode = mode;

        while p + PAYLOAD_SIZE_MINIMUM < window_end {
            let matched = decode_row(self.image, p, window_end, mode, cfg);
            match matched {
                None => p += 1,
                Some(RowMatch::Exact(payload)) => {
                    if cfg.removed_only {
                        // Intact records have keys; not what was asked for.
                        p += 1;
                        continue;
                    }
                    if !cfg.freespace_only {
                        let emitted =
                            emitter.emit_row(self.image, p, window_end, &payload, ps)?;
                        if emitted {
                            summary.rows_emitted += 1;
                            if cfg.debug {
                                diag!(
                                    emitter,
                                    "   row {} @ {} ({} cells, {} overflow pages)",
                                    payload.rowid.unwrap_or(0),
                                    p,
                                    payload.cells.len(),
                                    payload.overflow.len()
                                )?;
                            }
                        }
                    }
                    p += if cfg.fine_search {
                        1
                    } else {
                        (payload.length as usize).max(1)
                    };
                }
                Some(RowMatch::Partial { payload, used }) => {
                    let emitted = emitter.emit_row(self.image, p, window_end, &payload, ps)?;
                    if emitted {
                        summary.freeblock_rows += 1;
                    }
                    // Consume this record's bytes from the span; a span can
                    // hold several records back to back.
                    match mode {
                        DecodeMode::FreeBlock { span } if used < span as usize => {
                            mode = DecodeMode::FreeBlock {
                                span: span - used as u16,
                            };
                            p += used;
                        }
                        _ => break,
                    }
                }
            }
        }
        Ok(())
    }
}
