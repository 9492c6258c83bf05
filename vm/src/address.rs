//! Virtual address layout and decoded trace accesses.
//!
//! Addresses are split into a page number and an offset inside a 2 KiB page.
//! The page table covers the full 32-bit virtual space, i.e. 2^21 pages.

use std::fmt;

pub const PAGE_SHIFT: u32 = 11;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;
pub const OFFSET_MASK: u64 = PAGE_SIZE - 1;

pub const ADDRESS_BITS: u32 = 32;
pub const PAGE_TABLE_ENTRIES: usize = 1 << (ADDRESS_BITS - PAGE_SHIFT);

/// Splits a virtual address into `(page_number, offset)`.
pub fn decode(address: u64) -> (u64, u64) {
    (address >> PAGE_SHIFT, address & OFFSET_MASK)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Fetch,
    Load,
    Store,
    Modify,
}

impl AccessKind {
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            'I' => Some(AccessKind::Fetch),
            'L' => Some(AccessKind::Load),
            'S' => Some(AccessKind::Store),
            'M' => Some(AccessKind::Modify),
            _ => None,
        }
    }

    pub fn marker(&self) -> char {
        match self {
            AccessKind::Fetch => 'I',
            AccessKind::Load => 'L',
            AccessKind::Store => 'S',
            AccessKind::Modify => 'M',
        }
    }

    /// A modify is a load followed by a store on the same page, so it counts
    /// as two memory operations but a single page touch.
    pub fn weight(&self) -> u64 {
        match self {
            AccessKind::Modify => 2,
            _ => 1,
        }
    }

    /// Whether a page loaded for this access starts out dirty.
    pub fn writes(&self) -> bool {
        matches!(self, AccessKind::Store | AccessKind::Modify)
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryAccess {
    pub line_index: usize,
    pub kind: AccessKind,
    pub address: u64,
    pub page_number: u64,
    pub offset: u64,
}

impl MemoryAccess {
    pub fn new(line_index: usize, kind: AccessKind, address: u64) -> Self {
        let (page_number, offset) = decode(address);

        MemoryAccess {
            line_index,
            kind,
            address,
            page_number,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_page_and_offset() {
        assert_eq!(decode(0x0000), (0, 0));
        assert_eq!(decode(0x07FF), (0, 0x7FF));
        assert_eq!(decode(0x0800), (1, 0));
        assert_eq!(decode(0xCAFE), (0x19, 0x2FE));
        assert_eq!(decode(0xFFFF_FFFF), (PAGE_TABLE_ENTRIES as u64 - 1, 0x7FF));
    }

    #[test]
    fn test_addresses_past_32_bits_leave_the_table() {
        let (page, _) = decode(0x1_0000_0000);

        assert_eq!(page, PAGE_TABLE_ENTRIES as u64);
    }

    #[test]
    fn test_markers() {
        for kind in [AccessKind::Fetch, AccessKind::Load, AccessKind::Store, AccessKind::Modify] {
            assert_eq!(AccessKind::from_marker(kind.marker()), Some(kind));
        }

        assert_eq!(AccessKind::from_marker('X'), None);
        assert_eq!(AccessKind::from_marker('='), None);
    }

    #[test]
    fn test_modify_weighs_two() {
        assert_eq!(AccessKind::Modify.weight(), 2);
        assert_eq!(AccessKind::Store.weight(), 1);
        assert!(AccessKind::Modify.writes());
        assert!(AccessKind::Store.writes());
        assert!(!AccessKind::Load.writes());
        assert!(!AccessKind::Fetch.writes());
    }
}
