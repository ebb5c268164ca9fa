//! SQLite file and page structure constants.
//!
//! Offsets are taken from the database file format: the 100-byte file
//! header, the 8-byte leaf table page header, and the record (payload)
//! encoding. The recovery caps at the bottom are policy limits on how much
//! structure the carver will accept from an untrusted image.

// ── File header (100 bytes at the start of page 1) ──────────────────

/// Size of the database file header in bytes.
pub const DB_HEADER_SIZE: usize = 100;
/// Offset of the page size field. 2 bytes, big-endian; value 1 means 65536.
pub const HDR_PAGE_SIZE: usize = 16;
/// Offset of the page count field. 4 bytes.
pub const HDR_PAGE_COUNT: usize = 28;
/// Offset of the first free-list trunk page number. 4 bytes.
pub const HDR_FREELIST_HEAD: usize = 32;
/// Offset of the free-list page count. 4 bytes.
pub const HDR_FREELIST_PAGES: usize = 36;

/// Smallest legal page size.
pub const PAGE_SIZE_MIN: u32 = 512;
/// Largest legal page size (encoded as 1 in the header field).
pub const PAGE_SIZE_MAX: u32 = 65536;

// ── Leaf table page header (8 bytes after the type byte's offset) ───

/// Page-type byte identifying a leaf table page.
pub const LEAF_TABLE_PAGE: u8 = 0x0D;
/// Size of the leaf page header, including the type byte.
pub const LEAF_HEADER_SIZE: usize = 8;
/// Offset of the first free-block offset within the page. 2 bytes.
pub const LEAF_FREEBLOCK: usize = 1;
/// Offset of the cell count. 2 bytes.
pub const LEAF_CELL_COUNT: usize = 3;
/// Offset of the cell content area start. 2 bytes.
pub const LEAF_CONTENT_START: usize = 5;
/// Offset of the fragmented free byte count. 1 byte.
pub const LEAF_FRAG_BYTES: usize = 7;

/// Size of a free-block node header (next offset + size, both u16 BE).
pub const FREEBLOCK_HEADER_SIZE: usize = 4;

// ── Record encoding ─────────────────────────────────────────────────

/// Fewest bytes a record prefix can occupy; the per-page sweep stops this
/// many bytes short of the window end.
pub const PAYLOAD_SIZE_MINIMUM: usize = 10;
/// A payload whose body exceeds `page_size - 35` spills to overflow pages.
pub const OVERFLOW_LOCAL_RESERVE: u32 = 35;
/// Size of the next-page pointer at the head of each overflow page.
pub const OVERFLOW_PTR_SIZE: usize = 4;

// ── Recovery caps ───────────────────────────────────────────────────

/// Most cells a candidate record may carry before it is rejected.
pub const PAYLOAD_CELLS_MAX: usize = 1000;
/// Longest overflow chain a candidate record may reference.
pub const OVERFLOW_PAGES_MAX: usize = 10000;
/// Longest legal varint encoding.
pub const VARINT_MAX_LEN: usize = 9;
/// Longest legal serial-type varint encoding within a record header.
pub const SERIAL_VARINT_MAX_LEN: usize = 8;

// ── Filter defaults ─────────────────────────────────────────────────

/// Default minimum cell count for an accepted row.
pub const DEFAULT_CELLCOUNT_MIN: usize = 2;
/// Default maximum cell count for an accepted row.
pub const DEFAULT_CELLCOUNT_MAX: usize = PAYLOAD_CELLS_MAX;
/// Default minimum declared payload size for an accepted row.
pub const DEFAULT_ROWSIZE_MIN: u64 = 10;
