use std::collections::VecDeque;

use log::trace;

use crate::address::AccessKind;

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct PageTableEntry {
    pub valid: bool,
    pub referenced: bool,
    pub dirty: bool,
    pub frame_index: usize,
}

/// Single-level page table plus the physical frames it maps into.
///
/// Entries exist for the whole page-number space; at most `frame_count` of
/// them are valid at any time.
#[derive(Debug)]
pub struct PageTable {
    table: Vec<PageTableEntry>,
    frames: Vec<Option<usize>>,
    free_frames: VecDeque<usize>,
}

impl PageTable {
    pub fn new(page_count: usize, frame_count: usize) -> Self {
        PageTable {
            table: vec![PageTableEntry::default(); page_count],
            frames: vec![None; frame_count],
            free_frames: (0..frame_count).collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.table.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn resident_count(&self) -> usize {
        self.frame_count() - self.free_frames.len()
    }

    pub fn has_free_frame(&self) -> bool {
        !self.free_frames.is_empty()
    }

    pub fn lookup(&self, page_number: usize) -> Option<&PageTableEntry> {
        self.table.get(page_number)
    }

    pub fn is_resident(&self, page_number: usize) -> bool {
        self.lookup(page_number).map_or(false, |entry| entry.valid)
    }

    /// Page hit. Only the reference bit changes; a write hit leaves the dirty
    /// bit as it was set at load time.
    pub fn touch(&mut self, page_number: usize) {
        if let Some(entry) = self.table.get_mut(page_number) {
            if entry.valid {
                entry.referenced = true;
            }
        }
    }

    /// Loads `page_number` into the next free frame, returning the frame index.
    pub fn allocate(&mut self, page_number: usize, kind: AccessKind) -> Option<usize> {
        if page_number >= self.table.len() || self.table[page_number].valid {
            return None;
        }

        let frame_index = self.free_frames.pop_front()?;

        self.frames[frame_index] = Some(page_number);
        self.table[page_number] = PageTableEntry {
            valid: true,
            referenced: true,
            dirty: kind.writes(),
            frame_index,
        };

        trace!("page_table: page {:#X} -> frame {}", page_number, frame_index);

        Some(frame_index)
    }

    /// Drops `page_number` from its frame. Returns the entry as it was before
    /// eviction so the caller can see whether it needs writing back.
    pub fn evict(&mut self, page_number: usize) -> Option<PageTableEntry> {
        let entry = *self.table.get(page_number)?;

        if !entry.valid {
            return None;
        }

        self.table[page_number] = PageTableEntry::default();
        self.frames[entry.frame_index] = None;
        self.free_frames.push_back(entry.frame_index);

        trace!("page_table: page {:#X} left frame {}", page_number, entry.frame_index);

        Some(entry)
    }

    /// Resident pages in ascending frame order.
    pub fn resident_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.frames.iter().filter_map(|page| *page)
    }

    pub fn clear_reference_bits(&mut self) {
        for frame in 0..self.frames.len() {
            if let Some(page_number) = self.frames[frame] {
                self.table[page_number].referenced = false;
            }
        }
    }
}
