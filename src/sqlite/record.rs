//! Record (payload) decoding.
//!
//! A row record is a length varint, a rowid varint, and a payload: a
//! header of serial-type varints followed by the cell bodies. Nothing on a
//! damaged image says where records start, so [`decode_row`] is written to
//! be aimed at an arbitrary byte offset and to say "no" cheaply: the
//! declared payload length must equal the header size plus the sum of the
//! cell body sizes, two numbers that are encoded independently on disk.
//! A cursor that is not really at a record start almost never survives
//! that cross-check.
//!
//! Records pulled out of free-block spans have no length or rowid varints
//! of their own (the span size stands in for the length), and one span may
//! hold several records back to back; [`DecodeMode::FreeBlock`] carries
//! those semantics.

use crate::sqlite::constants::*;
use crate::sqlite::image::Image;
use crate::sqlite::scan::ScanConfig;
use crate::sqlite::varint::get_varint;

/// Storage class of one cell, from the record header's serial type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    Int8,
    Int16,
    Int24,
    Int32,
    Int48,
    Int64,
    Float64,
    Zero,
    One,
    Blob,
    Text,
}

impl SerialType {
    /// Map a serial type code to its storage class and body size.
    ///
    /// Codes 10 and 11 are reserved and return `None`; a record header
    /// containing them is rejected outright.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqcarve::sqlite::record::SerialType;
    ///
    /// assert_eq!(SerialType::decode(0), Some((SerialType::Null, 0)));
    /// assert_eq!(SerialType::decode(5), Some((SerialType::Int48, 6)));
    /// assert_eq!(SerialType::decode(10), None);
    /// assert_eq!(SerialType::decode(23), Some((SerialType::Text, 5)));
    /// ```
    pub fn decode(code: u64) -> Option<(SerialType, usize)> {
        match code {
            0 => Some((SerialType::Null, 0)),
            1 => Some((SerialType::Int8, 1)),
            2 => Some((SerialType::Int16, 2)),
            3 => Some((SerialType::Int24, 3)),
            4 => Some((SerialType::Int32, 4)),
            5 => Some((SerialType::Int48, 6)),
            6 => Some((SerialType::Int64, 8)),
            7 => Some((SerialType::Float64, 8)),
            8 => Some((SerialType::Zero, 0)),
            9 => Some((SerialType::One, 0)),
            10 | 11 => None,
            n if n & 1 == 0 => Some((SerialType::Blob, ((n - 12) / 2) as usize)),
            n => Some((SerialType::Text, ((n - 13) / 2) as usize)),
        }
    }
}

/// One decoded cell: storage class, body size, and body offset relative to
/// the record start.
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub serial: SerialType,
    pub size: usize,
    pub offset: usize,
}

/// A validated payload descriptor for one recovery attempt.
#[derive(Debug, Clone)]
pub struct Payload {
    /// Body bytes expected after the record prefix. In free-block mode
    /// this is the span size minus the node header and payload header.
    pub length: u64,
    /// Rowid key; `None` for records reconstructed from free-block spans,
    /// which have lost theirs.
    pub rowid: Option<u64>,
    /// Bytes consumed by the length and rowid varints.
    pub prefix_len: usize,
    /// Payload header size, including its own varint.
    pub header_size: u64,
    /// Cells in record order.
    pub cells: Vec<Cell>,
    /// Overflow chain page numbers, in read order; empty when the record
    /// fits in its home page.
    pub overflow: Vec<u32>,
}

/// How a candidate cursor is interpreted.
#[derive(Debug, Clone, Copy)]
pub enum DecodeMode {
    /// An intact record: length varint, rowid varint, payload.
    Normal,
    /// Bytes inside a free-block span of `span` bytes (node header
    /// included). The span size replaces the missing length varint.
    FreeBlock { span: u16 },
}

/// A successful decode.
#[derive(Debug)]
pub enum RowMatch {
    /// Normal mode: the declared length matched exactly.
    Exact(Payload),
    /// Free-block mode: a record consuming `used` bytes of the span.
    /// Spans holding several concatenated records yield one partial match
    /// each.
    Partial { payload: Payload, used: usize },
}

impl RowMatch {
    pub fn payload(&self) -> &Payload {
        match self {
            RowMatch::Exact(p) => p,
            RowMatch::Partial { payload, .. } => payload,
        }
    }
}

/// Attempt to decode one record at `base`.
///
/// `window_end` is the exclusive end of the current page window; the last
/// four bytes of that window hold the first overflow page number when the
/// payload spills. Header varints themselves are bounded only by the file,
/// since a record's header may legitimately run past a mis-sized window on
/// damaged images.
///
/// Returns `None` for anything that fails validation; the scanner treats
/// that as "advance one byte and retry".
pub fn decode_row(
    image: &Image,
    base: usize,
    window_end: usize,
    mode: DecodeMode,
    cfg: &ScanConfig,
) -> Option<RowMatch> {
    let data = image.as_bytes();
    let file_len = data.len();
    let mut p = base;

    // Step 1: payload length. Free-block spans carry no length varint;
    // the span size minus the node header stands in.
    let mut length = match mode {
        DecodeMode::Normal => {
            let (v, n) = get_varint(data.get(p..)?)?;
            p += n;
            v
        }
        DecodeMode::FreeBlock { span } => u64::from(span).checked_sub(4)?,
    };

    if length > file_len as u64 {
        return None;
    }
    if length < cfg.rowsize_min || length > cfg.rowsize_max {
        return None;
    }

    // Step 2: rowid.
    let rowid = match mode {
        DecodeMode::Normal => {
            let (v, n) = get_varint(data.get(p..)?)?;
            p += n;
            if v < 1 {
                return None;
            }
            Some(v)
        }
        DecodeMode::FreeBlock { .. } => None,
    };
    let prefix_len = p - base;

    // Step 3: payload header size (its varint counts toward the size).
    let header_start = p;
    let (header_size, n) = get_varint(data.get(p..)?)?;
    p += n;
    if header_size > u64::from(cfg.page_size) || header_size < 2 {
        return None;
    }
    if matches!(mode, DecodeMode::FreeBlock { .. }) {
        // The span covers header and body together; from here on `length`
        // means body bytes only.
        length = length.checked_sub(header_size)?;
    }

    // Step 4: overflow chain. A payload too large for its home page ends
    // the page window with the first overflow page number.
    let mut overflow = Vec::new();
    if length > u64::from(cfg.page_size - OVERFLOW_LOCAL_RESERVE) {
        if window_end < OVERFLOW_PTR_SIZE {
            return None;
        }
        let mut next = image.u32_be(window_end - OVERFLOW_PTR_SIZE)?;
        while next != 0 {
            if next > cfg.page_count {
                return None;
            }
            let origin = (next as usize - 1) * cfg.page_size as usize;
            if origin + OVERFLOW_PTR_SIZE >= file_len {
                return None;
            }
            overflow.push(next);
            if overflow.len() > OVERFLOW_PAGES_MAX {
                return None;
            }
            next = image.u32_be(origin)?;
        }
    }

    // Step 5: serial types. Walk the header region, accumulating the body
    // size each cell claims.
    let header_end = header_start + header_size as usize;
    let mut cells = Vec::new();
    let mut running: u64 = 0;
    loop {
        let (code, n) = get_varint(data.get(p..)?)?;
        if n > SERIAL_VARINT_MAX_LEN {
            return None;
        }
        let (serial, size) = SerialType::decode(code)?;
        let offset = header_end + running as usize - base;
        running += size as u64;
        if running > length {
            return None;
        }
        cells.push(Cell { serial, size, offset });
        // The policy cap holds no matter how far the user filter is raised.
        if cells.len() > PAYLOAD_CELLS_MAX {
            return None;
        }
        if cells.len() > cfg.cellcount_max {
            return None;
        }
        p += n;
        if p >= header_end {
            break;
        }
    }

    if cells.len() < cfg.cellcount_min {
        return None;
    }

    let payload = Payload {
        length,
        rowid,
        prefix_len,
        header_size,
        cells,
        overflow,
    };

    // Step 6: the cross-check. Two independently encoded sizes must agree.
    match mode {
        DecodeMode::Normal => {
            if running + header_size == payload.length {
                Some(RowMatch::Exact(payload))
            } else {
                None
            }
        }
        DecodeMode::FreeBlock { .. } => {
            // `running <= length` held throughout the loop; the remainder
            // of the span may hold further records.
            let used = (running + header_size) as usize + FREEBLOCK_HEADER_SIZE;
            Some(RowMatch::Partial { payload, used })
        }
    }
}
