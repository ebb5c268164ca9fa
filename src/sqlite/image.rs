//! Read-only access to the input file bytes.
//!
//! The whole input is exposed as one immutable byte region ([`Image`]),
//! memory-mapped when it comes from disk. Every accessor is bounds-checked
//! and returns `None` for any address outside the file window; callers
//! treat that as "not a record" rather than an error, which is what keeps
//! the scan alive on truncated or hostile images.

use std::fs::File;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;

use crate::CarveError;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// An immutable, randomly addressable view of a database file image.
pub struct Image {
    data: Backing,
}

impl Image {
    /// Map a file read-only.
    ///
    /// Zero-length files cannot be mapped and are represented as an empty
    /// image instead.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CarveError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CarveError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
        let len = file
            .metadata()
            .map_err(|e| CarveError::Io(format!("Cannot stat {}: {}", path.display(), e)))?
            .len();

        if len == 0 {
            return Ok(Image {
                data: Backing::Owned(Vec::new()),
            });
        }

        // Safety: the map is never written through, and the scan owns the
        // mapping for its whole lifetime. A concurrent writer to the input
        // file can change what the scan reads, which is inherent to carving
        // a live file and is the caller's problem.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| CarveError::Io(format!("Cannot map {}: {}", path.display(), e)))?;
        Ok(Image {
            data: Backing::Mapped(mmap),
        })
    }

    /// Wrap an in-memory byte buffer (used by tests and benchmarks).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Image {
            data: Backing::Owned(bytes),
        }
    }

    /// Total file size in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true for a zero-length input.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The full file window.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            Backing::Mapped(m) => m,
            Backing::Owned(v) => v,
        }
    }

    /// A `len`-byte window at `offset`, or `None` if any part of it falls
    /// outside the file.
    pub fn slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.as_bytes().get(offset..end)
    }

    /// Single byte at `offset`.
    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.as_bytes().get(offset).copied()
    }

    /// Big-endian u16 at `offset`.
    pub fn u16_be(&self, offset: usize) -> Option<u16> {
        self.slice(offset, 2).map(BigEndian::read_u16)
    }

    /// Big-endian u32 at `offset`.
    pub fn u32_be(&self, offset: usize) -> Option<u32> {
        self.slice(offset, 4).map(BigEndian::read_u32)
    }
}
