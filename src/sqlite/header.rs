//! Database file header fields.
//!
//! Only four fields of the 100-byte file prefix matter to the carver: the
//! page size, the declared page count, and the free-list head and length.
//! Everything else in the header (change counters, schema cookie, text
//! encoding) is catalog-level state the recovery engine ignores.

use crate::sqlite::constants::*;
use crate::sqlite::image::Image;
use crate::CarveError;

/// The file-header fields consumed by the scan.
#[derive(Debug, Clone)]
pub struct DbHeader {
    /// Page size in bytes. A header value of 1 means 65536.
    pub page_size: u32,
    /// Declared page count. May disagree with the file size on truncated
    /// or vacuum-interrupted images.
    pub page_count: u32,
    /// First page of the free-list trunk, or 0.
    pub freelist_head: u32,
    /// Number of free-list pages.
    pub freelist_pages: u32,
}

impl DbHeader {
    /// Read the header fields, with `page_size_override` taking the place
    /// of the header's page size field when set (for images whose first
    /// page has been damaged or overwritten).
    ///
    /// Fails when the page size is not a power of two in `[512, 65536]` or
    /// when the file is smaller than a single page.
    pub fn read(image: &Image, page_size_override: Option<u32>) -> Result<Self, CarveError> {
        if image.len() < DB_HEADER_SIZE {
            return Err(CarveError::Format(format!(
                "File holds {} bytes, less than the {}-byte header",
                image.len(),
                DB_HEADER_SIZE
            )));
        }

        let page_size = match page_size_override {
            Some(ps) => ps,
            None => {
                // In bounds after the length guard above.
                let raw = image.u16_be(HDR_PAGE_SIZE).unwrap_or(0);
                // The 16-bit field cannot express 65536 directly.
                if raw == 1 {
                    PAGE_SIZE_MAX
                } else {
                    u32::from(raw)
                }
            }
        };

        if !page_size.is_power_of_two() || !(PAGE_SIZE_MIN..=PAGE_SIZE_MAX).contains(&page_size) {
            return Err(CarveError::Format(format!(
                "Illegal page size {} (expected a power of two in [{}, {}])",
                page_size, PAGE_SIZE_MIN, PAGE_SIZE_MAX
            )));
        }

        if image.len() < page_size as usize {
            return Err(CarveError::Format(format!(
                "File holds {} bytes, less than one {}-byte page",
                image.len(),
                page_size
            )));
        }

        Ok(DbHeader {
            page_size,
            page_count: image.u32_be(HDR_PAGE_COUNT).unwrap_or(0),
            freelist_head: image.u32_be(HDR_FREELIST_HEAD).unwrap_or(0),
            freelist_pages: image.u32_be(HDR_FREELIST_PAGES).unwrap_or(0),
        })
    }

    /// The page count the sweep actually trusts: the header's count when it
    /// is consistent with the file size, otherwise the number of whole
    /// pages present in the file.
    pub fn effective_page_count(&self, file_len: usize) -> u32 {
        let in_file = (file_len / self.page_size as usize) as u32;
        if self.page_count == 0 || self.page_count > in_file {
            in_file
        } else {
            self.page_count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    fn header_image(page_size_field: u16, page_count: u32, pages: usize) -> Image {
        let ps = if page_size_field == 1 {
            65536
        } else {
            page_size_field as usize
        };
        let mut bytes = vec![0u8; ps * pages];
        bytes[..16].copy_from_slice(b"SQLite format 3\0");
        BigEndian::write_u16(&mut bytes[HDR_PAGE_SIZE..], page_size_field);
        BigEndian::write_u32(&mut bytes[HDR_PAGE_COUNT..], page_count);
        BigEndian::write_u32(&mut bytes[HDR_FREELIST_HEAD..], 3);
        BigEndian::write_u32(&mut bytes[HDR_FREELIST_PAGES..], 1);
        Image::from_bytes(bytes)
    }

    #[test]
    fn test_read_basic_fields() {
        let img = header_image(512, 4, 4);
        let hdr = DbHeader::read(&img, None).unwrap();
        assert_eq!(hdr.page_size, 512);
        assert_eq!(hdr.page_count, 4);
        assert_eq!(hdr.freelist_head, 3);
        assert_eq!(hdr.freelist_pages, 1);
    }

    #[test]
    fn test_page_size_one_means_64k() {
        let img = header_image(1, 1, 1);
        let hdr = DbHeader::read(&img, None).unwrap();
        assert_eq!(hdr.page_size, 65536);
    }

    #[test]
    fn test_illegal_page_size_is_fatal() {
        let img = header_image(512, 1, 1);
        // Corrupt the field in-place via override-free images of odd sizes
        let mut bytes = img.as_bytes().to_vec();
        BigEndian::write_u16(&mut bytes[HDR_PAGE_SIZE..], 1000); // not a power of two
        assert!(DbHeader::read(&Image::from_bytes(bytes.clone()), None).is_err());
        BigEndian::write_u16(&mut bytes[HDR_PAGE_SIZE..], 256); // below minimum
        assert!(DbHeader::read(&Image::from_bytes(bytes), None).is_err());
    }

    #[test]
    fn test_override_ignores_header_field() {
        let img = header_image(512, 2, 2);
        let hdr = DbHeader::read(&img, Some(1024)).unwrap();
        assert_eq!(hdr.page_size, 1024);
        // ...but an illegal override is still rejected
        assert!(DbHeader::read(&img, Some(640)).is_err());
    }

    #[test]
    fn test_file_shorter_than_one_page_is_fatal() {
        let mut bytes = vec![0u8; 300];
        BigEndian::write_u16(&mut bytes[HDR_PAGE_SIZE..], 512);
        assert!(DbHeader::read(&Image::from_bytes(bytes), None).is_err());
    }

    #[test]
    fn test_file_shorter_than_header_is_fatal() {
        let err = DbHeader::read(&Image::from_bytes(vec![0u8; 64]), None).unwrap_err();
        assert!(err.to_string().contains("header"));
        // An override does not bypass the header-length guard.
        assert!(DbHeader::read(&Image::from_bytes(vec![0u8; 64]), Some(512)).is_err());
    }

    #[test]
    fn test_effective_page_count() {
        let img = header_image(512, 4, 4);
        let hdr = DbHeader::read(&img, None).unwrap();
        assert_eq!(hdr.effective_page_count(img.len()), 4);
        // header count beyond the file clamps to whole pages present
        assert_eq!(hdr.effective_page_count(512 * 3), 3);
        assert_eq!(hdr.effective_page_count(512 * 3 + 100), 3);
        // zero header count falls back to the file size
        let hdr0 = DbHeader {
            page_count: 0,
            ..hdr
        };
        assert_eq!(hdr0.effective_page_count(512 * 4), 4);
    }
}
