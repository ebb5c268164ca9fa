//! Payload materialization and CSV emission.
//!
//! A validated descriptor still has to be turned into bytes and text. For
//! records that fit their home page the payload is a borrowed view of the
//! file window; records with overflow chains are reassembled into an owned
//! buffer (home-page bytes minus the trailing 4-byte pointer, then
//! `page_size - 4` bytes from each overflow page). Either way every
//! address is checked against the file window first, and a record whose
//! bytes cannot be fully gathered is dropped without output.
//!
//! Cell text rendering follows the tool's CSV conventions: `NULL`, `x`-
//! prefixed signed int8, plain signed decimals for the wider integers,
//! six-digit floats, double-quoted TEXT with `"` doubled and unprintable
//! bytes as dots, and BLOBs inline as `x'…'` hex until they outgrow the
//! spill limit and land in numbered `.blob` sidecar files.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use byteorder::{BigEndian, ByteOrder};

use crate::sqlite::constants::*;
use crate::sqlite::image::Image;
use crate::sqlite::record::{Cell, Payload, SerialType};
use crate::CarveError;

/// Settings for the output stage.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Emit BLOB cells at all.
    pub report_blobs: bool,
    /// BLOBs at or above this size go to sidecar files instead of inline hex.
    pub blob_size_limit: u64,
    /// Directory receiving `N.blob` sidecar files.
    pub blob_dir: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            report_blobs: true,
            blob_size_limit: u64::MAX,
            blob_dir: PathBuf::from("."),
        }
    }
}

enum PayloadBytes<'a> {
    Direct(&'a [u8]),
    Assembled(Vec<u8>),
}

impl PayloadBytes<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            PayloadBytes::Direct(s) => s,
            PayloadBytes::Assembled(v) => v,
        }
    }
}

/// Gather the payload bytes for `payload` into one contiguous region.
///
/// Returns `None` when any needed byte lies outside the file window, which
/// skips the record.
fn materialize<'a>(
    image: &'a Image,
    base: usize,
    window_end: usize,
    payload: &Payload,
    page_size: usize,
) -> Option<PayloadBytes<'a>> {
    // Furthest byte any cell will read, relative to the record start.
    let need = payload
        .cells
        .iter()
        .map(|c| c.offset + c.size)
        .max()
        .unwrap_or(0);

    if payload.overflow.is_empty() {
        return image.slice(base, need).map(PayloadBytes::Direct);
    }

    // Home-page portion runs to the overflow pointer at the window's end.
    let head_len = window_end.checked_sub(OVERFLOW_PTR_SIZE)?.checked_sub(base)?;
    let head = image.slice(base, head_len)?;
    let mut buf = Vec::with_capacity(head_len + payload.overflow.len() * (page_size - 4));
    buf.extend_from_slice(head);
    for &page in &payload.overflow {
        let origin = (page as usize - 1) * page_size;
        let chunk = image.slice(origin + OVERFLOW_PTR_SIZE, page_size - OVERFLOW_PTR_SIZE)?;
        buf.extend_from_slice(chunk);
    }
    if need > buf.len() {
        return None;
    }
    Some(PayloadBytes::Assembled(buf))
}

/// Writes recovered rows as CSV lines and carves large BLOBs to sidecar
/// files. The blob counter is the only scan-wide mutable state.
pub struct Emitter<'w> {
    out: &'w mut dyn Write,
    cfg: RenderConfig,
    blob_count: u32,
    blob_files: u32,
}

macro_rules! emit {
    ($self:expr, $($arg:tt)*) => {
        write!($self.out, $($arg)*).map_err(|e| CarveError::Io(e.to_string()))
    };
}

impl<'w> Emitter<'w> {
    pub fn new(out: &'w mut dyn Write, cfg: RenderConfig) -> Self {
        Emitter {
            out,
            cfg,
            blob_count: 0,
            blob_files: 0,
        }
    }

    /// The underlying writer, for interleaved diagnostics.
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// Number of BLOB cells encountered so far.
    pub fn blob_count(&self) -> u32 {
        self.blob_count
    }

    /// Number of sidecar files written so far.
    pub fn blob_files(&self) -> u32 {
        self.blob_files
    }

    /// Materialize and emit one row. Returns `Ok(false)` when the record
    /// was dropped because its bytes could not be gathered.
    pub fn emit_row(
        &mut self,
        image: &Image,
        base: usize,
        window_end: usize,
        payload: &Payload,
        page_size: usize,
    ) -> Result<bool, CarveError> {
        let bytes = match materialize(image, base, window_end, payload, page_size) {
            Some(b) => b,
            None => return Ok(false),
        };
        let data = bytes.as_slice();

        match payload.rowid {
            Some(id) => emit!(self, "{}", id)?,
            None => emit!(self, "-1")?,
        }
        for cell in &payload.cells {
            emit!(self, ",")?;
            self.render_cell(data, cell)?;
        }
        emit!(self, "\n")?;
        Ok(true)
        // `bytes` drops here; no payload buffer survives its row.
    }

    fn render_cell(&mut self, data: &[u8], cell: &Cell) -> Result<(), CarveError> {
        // In bounds by construction: materialize checked the furthest read.
        let body = &data[cell.offset..cell.offset + cell.size];
        match cell.serial {
            SerialType::Null => emit!(self, "NULL"),
            SerialType::Int8 => emit!(self, "x{}", body[0] as i8),
            SerialType::Int16 => emit!(self, "{}", BigEndian::read_i16(body)),
            SerialType::Int24 => emit!(self, "{}", BigEndian::read_i24(body)),
            SerialType::Int32 => emit!(self, "{}", BigEndian::read_i32(body)),
            SerialType::Int48 => emit!(self, "{}", BigEndian::read_i48(body)),
            SerialType::Int64 => emit!(self, "{}", BigEndian::read_i64(body)),
            SerialType::Float64 => emit!(self, "{:.6}", BigEndian::read_f64(body)),
            SerialType::Zero => emit!(self, "0"),
            SerialType::One => emit!(self, "1"),
            SerialType::Text => self.render_text(body),
            SerialType::Blob => self.render_blob(body),
        }
    }

    fn render_text(&mut self, body: &[u8]) -> Result<(), CarveError> {
        emit!(self, "\"")?;
        for &b in body {
            if b == b'"' {
                emit!(self, "\"")?;
            }
            if b.is_ascii_graphic() || b == b' ' {
                emit!(self, "{}", b as char)?;
            } else {
                emit!(self, ".")?;
            }
        }
        emit!(self, "\"")
    }

    fn render_blob(&mut self, body: &[u8]) -> Result<(), CarveError> {
        if self.cfg.report_blobs {
            if (body.len() as u64) < self.cfg.blob_size_limit {
                emit!(self, "x'")?;
                for b in body {
                    emit!(self, "{:02X}", b)?;
                }
                emit!(self, "'")?;
            } else {
                let name = format!("{}.blob", self.blob_count);
                let path = self.cfg.blob_dir.join(&name);
                match fs::write(&path, body) {
                    Ok(()) => self.blob_files += 1,
                    // A failed sidecar write loses the blob, not the scan.
                    Err(e) => eprintln!("Cannot write {}: {}", path.display(), e),
                }
                emit!(self, "\"{}\"", name)?;
            }
        }
        // The counter advances for every BLOB cell seen, reported or not,
        // so sidecar numbering is stable across switch variations.
        self.blob_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::record::Payload;
    use byteorder::{BigEndian, ByteOrder};
    use tempfile::tempdir;

    fn cell(serial: SerialType, size: usize, offset: usize) -> Cell {
        Cell { serial, size, offset }
    }

    fn payload(rowid: Option<u64>, cells: Vec<Cell>, overflow: Vec<u32>) -> Payload {
        let length: u64 = cells.iter().map(|c| c.size as u64).sum();
        Payload {
            length,
            rowid,
            prefix_len: 0,
            header_size: 0,
            cells,
            overflow,
        }
    }

    fn emit_to_string(image: &Image, base: usize, window_end: usize, p: &Payload) -> String {
        let mut out = Vec::new();
        let mut em = Emitter::new(&mut out, RenderConfig::default());
        em.emit_row(image, base, window_end, p, 512).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_integer_widths_and_sign_extension() {
        let mut bytes = vec![0u8; 64];
        bytes[0] = 0xfe; // int8 -2
        BigEndian::write_i16(&mut bytes[1..], -300);
        bytes[3] = 0xff; // int24 -1
        bytes[4] = 0xff;
        bytes[5] = 0xff;
        BigEndian::write_i32(&mut bytes[6..], -70000);
        BigEndian::write_i48(&mut bytes[10..], -1_099_511_627_776);
        BigEndian::write_i64(&mut bytes[16..], i64::MIN + 1);
        let img = Image::from_bytes(bytes);

        let p = payload(
            Some(9),
            vec![
                cell(SerialType::Int8, 1, 0),
                cell(SerialType::Int16, 2, 1),
                cell(SerialType::Int24, 3, 3),
                cell(SerialType::Int32, 4, 6),
                cell(SerialType::Int48, 6, 10),
                cell(SerialType::Int64, 8, 16),
            ],
            vec![],
        );
        assert_eq!(
            emit_to_string(&img, 0, 64, &p),
            format!(
                "9,x-2,-300,-1,-70000,-1099511627776,{}\n",
                i64::MIN + 1
            )
        );
    }

    #[test]
    fn test_null_constants_and_float() {
        let mut bytes = vec![0u8; 16];
        BigEndian::write_f64(&mut bytes[0..], -2.5);
        let img = Image::from_bytes(bytes);

        let p = payload(
            Some(1),
            vec![
                cell(SerialType::Null, 0, 0),
                cell(SerialType::Zero, 0, 0),
                cell(SerialType::One, 0, 0),
                cell(SerialType::Float64, 8, 0),
            ],
            vec![],
        );
        assert_eq!(emit_to_string(&img, 0, 16, &p), "1,NULL,0,1,-2.500000\n");
    }

    #[test]
    fn test_text_quoting_and_unprintables() {
        let img = Image::from_bytes(b"say \"hi\"\x00\xff".to_vec());
        let p = payload(Some(2), vec![cell(SerialType::Text, 10, 0)], vec![]);
        assert_eq!(emit_to_string(&img, 0, 10, &p), "2,\"say \"\"hi\"\"..\"\n");
    }

    #[test]
    fn test_inline_blob_hex() {
        let img = Image::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let p = payload(Some(3), vec![cell(SerialType::Blob, 4, 0)], vec![]);
        assert_eq!(emit_to_string(&img, 0, 4, &p), "3,x'DEADBEEF'\n");
    }

    #[test]
    fn test_blob_spills_to_sidecar_file() {
        let dir = tempdir().unwrap();
        let img = Image::from_bytes(vec![0xab; 32]);
        let p = payload(
            Some(4),
            vec![
                cell(SerialType::Blob, 16, 0),
                cell(SerialType::Blob, 2, 16),
            ],
            vec![],
        );

        let mut out = Vec::new();
        let cfg = RenderConfig {
            report_blobs: true,
            blob_size_limit: 10,
            blob_dir: dir.path().to_path_buf(),
        };
        let mut em = Emitter::new(&mut out, cfg);
        em.emit_row(&img, 0, 32, &p, 512).unwrap();
        assert_eq!(em.blob_files(), 1);
        assert_eq!(em.blob_count(), 2);

        assert_eq!(String::from_utf8(out).unwrap(), "4,\"0.blob\",x'ABAB'\n");
        assert_eq!(fs::read(dir.path().join("0.blob")).unwrap(), vec![0xab; 16]);
    }

    #[test]
    fn test_no_blobs_suppresses_but_still_counts() {
        let img = Image::from_bytes(vec![0xab; 8]);
        let p = payload(
            Some(5),
            vec![cell(SerialType::Blob, 4, 0), cell(SerialType::One, 0, 4)],
            vec![],
        );

        let mut out = Vec::new();
        let cfg = RenderConfig {
            report_blobs: false,
            ..RenderConfig::default()
        };
        let mut em = Emitter::new(&mut out, cfg);
        em.emit_row(&img, 0, 8, &p, 512).unwrap();
        assert_eq!(em.blob_count(), 1);
        assert_eq!(em.blob_files(), 0);

        assert_eq!(String::from_utf8(out).unwrap(), "5,,1\n");
    }

    #[test]
    fn test_freeblock_rows_print_minus_one() {
        let img = Image::from_bytes(vec![7u8; 8]);
        let p = payload(None, vec![cell(SerialType::Int8, 1, 0)], vec![]);
        assert_eq!(emit_to_string(&img, 0, 8, &p), "-1,x7\n");
    }

    #[test]
    fn test_overflow_assembly_concatenates_pages() {
        let ps = 512usize;
        let mut bytes = vec![0u8; ps * 3];
        // Home page (page 1) carries the record at offset 8; fill its tail
        // with 'A' up to the overflow pointer.
        for b in &mut bytes[8..ps - 4] {
            *b = b'A';
        }
        BigEndian::write_u32(&mut bytes[ps - 4..], 2);
        // Page 2 continues with 'B', chains to page 3 with 'C'.
        BigEndian::write_u32(&mut bytes[ps..], 3);
        for b in &mut bytes[ps + 4..2 * ps] {
            *b = b'B';
        }
        BigEndian::write_u32(&mut bytes[2 * ps..], 0);
        for b in &mut bytes[2 * ps + 4..3 * ps] {
            *b = b'C';
        }
        let img = Image::from_bytes(bytes);

        let text_len = (ps - 4 - 8) + 2 * (ps - 4);
        let p = payload(
            Some(6),
            vec![cell(SerialType::Text, text_len, 0)],
            vec![2, 3],
        );
        let line = emit_to_string(&img, 8, ps, &p);
        let expected: String = std::iter::repeat('A')
            .take(ps - 4 - 8)
            .chain(std::iter::repeat('B').take(ps - 4))
            .chain(std::iter::repeat('C').take(ps - 4))
            .collect();
        assert_eq!(line, format!("6,\"{}\"\n", expected));
    }

    #[test]
    fn test_missing_overflow_page_drops_record() {
        let ps = 512usize;
        let bytes = vec![0u8; ps]; // page 2 absent
        let img = Image::from_bytes(bytes);
        let p = payload(Some(1), vec![cell(SerialType::Text, 900, 0)], vec![2]);

        let mut out = Vec::new();
        let mut em = Emitter::new(&mut out, RenderConfig::default());
        let emitted = em.emit_row(&img, 8, ps, &p, ps).unwrap();
        assert!(!emitted);
        assert!(out.is_empty());
    }

    #[test]
    fn test_direct_view_bounds_checked() {
        let img = Image::from_bytes(vec![0u8; 16]);
        // Cell claims bytes past the end of the file.
        let p = payload(Some(1), vec![cell(SerialType::Text, 32, 0)], vec![]);
        let mut out = Vec::new();
        let mut em = Emitter::new(&mut out, RenderConfig::default());
        assert!(!em.emit_row(&img, 0, 16, &p, 512).unwrap());
        assert!(out.is_empty());
    }
}
