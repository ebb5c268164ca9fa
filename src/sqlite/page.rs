//! Leaf table pages and free-block chains.
//!
//! A leaf table page starts with the byte `0x0D` followed by an 8-byte
//! header. Deleted rows leave their bytes behind in the page's free-block
//! chain: a singly linked list of unused spans, each node carrying a
//! 2-byte next-offset and a 2-byte size (which includes the 4-byte node
//! header itself). The chain on a damaged image can point anywhere, so the
//! walk bounds-checks every node and caps its length.

use byteorder::{BigEndian, ByteOrder};

use crate::sqlite::constants::*;

/// Parsed leaf table page header.
#[derive(Debug, Clone, Copy)]
pub struct LeafHeader {
    /// Offset of the first free block within the page, or 0.
    pub freeblock_offset: u16,
    /// Number of cells on the page.
    pub cell_count: u16,
    /// Start of the cell content area.
    pub content_start: u16,
    /// Fragmented free bytes within the cell content area.
    pub frag_bytes: u8,
}

impl LeafHeader {
    /// Parse a leaf header from a page window.
    ///
    /// Returns `None` unless the window starts with the leaf table page
    /// type byte and is long enough to hold the header.
    pub fn parse(page: &[u8]) -> Option<Self> {
        if page.len() < LEAF_HEADER_SIZE || page[0] != LEAF_TABLE_PAGE {
            return None;
        }
        Some(LeafHeader {
            freeblock_offset: BigEndian::read_u16(&page[LEAF_FREEBLOCK..]),
            cell_count: BigEndian::read_u16(&page[LEAF_CELL_COUNT..]),
            content_start: BigEndian::read_u16(&page[LEAF_CONTENT_START..]),
            frag_bytes: page[LEAF_FRAG_BYTES],
        })
    }
}

/// One node of a page's free-block chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    /// Offset of this node within the page.
    pub offset: u16,
    /// Offset of the next node, or 0.
    pub next: u16,
    /// Span size in bytes, including the 4-byte node header.
    pub size: u16,
}

/// Walk the free-block chain starting at `first`.
///
/// The walk stops at the terminating 0 offset, at the first node whose
/// header would read outside the page, or after one node per possible
/// position (which breaks pointer cycles in corrupted chains).
pub fn walk_freeblocks(page: &[u8], first: u16) -> Vec<FreeBlock> {
    let mut blocks = Vec::new();
    let max_nodes = page.len() / FREEBLOCK_HEADER_SIZE;
    let mut offset = first;

    while offset != 0 && blocks.len() < max_nodes {
        let o = offset as usize;
        if o + FREEBLOCK_HEADER_SIZE > page.len() {
            break;
        }
        let next = BigEndian::read_u16(&page[o..]);
        let size = BigEndian::read_u16(&page[o + 2..]);
        blocks.push(FreeBlock { offset, next, size });
        offset = next;
    }

    blocks
}
