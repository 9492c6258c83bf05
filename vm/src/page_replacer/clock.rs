use std::collections::HashMap;

use log::trace;

use super::{PageEvent, PageReplacer};
use crate::page_table::PageTable;

#[derive(Copy, Clone, Debug)]
struct Slot {
    page: usize,
    referenced: bool,
    prev: usize,
    next: usize,
}

/// Second chance.
///
/// Resident pages sit on a circular list in load order. Each carries its own
/// reference bit, set on load and on every hit. The hand clears set bits as
/// it sweeps and evicts the first page whose bit is already clear.
///
/// The ring lives in a slot arena linked by index, with a page-to-slot map so
/// that pages can be unlinked by identity.
#[derive(Debug, Default)]
pub struct Clock {
    slots: Vec<Option<Slot>>,
    free_slots: Vec<usize>,
    slot_of: HashMap<usize, usize>,
    hand: Option<usize>,
}

impl Clock {
    pub fn new() -> Self {
        Clock::default()
    }

    pub fn len(&self) -> usize {
        self.slot_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_of.is_empty()
    }

    pub fn contains(&self, page: usize) -> bool {
        self.slot_of.contains_key(&page)
    }

    /// `(page, referenced)` pairs starting at the hand.
    pub fn ring(&self) -> Vec<(usize, bool)> {
        let mut ring = Vec::with_capacity(self.len());
        let mut cursor = self.hand;

        while let Some(idx) = cursor {
            let Some(slot) = self.slots[idx] else { break };

            ring.push((slot.page, slot.referenced));
            cursor = Some(slot.next).filter(|next| Some(*next) != self.hand);
        }

        ring
    }

    /// Appends `page` just behind the hand, i.e. at the tail of the sweep.
    fn insert(&mut self, page: usize) {
        if let Some(&idx) = self.slot_of.get(&page) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.referenced = true;
            }
            return;
        }

        let idx = match self.free_slots.pop() {
            Some(idx) => idx,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };

        let (prev, next) = match self.hand {
            None => (idx, idx),
            Some(head) => {
                let tail = self.slots[head].map_or(head, |slot| slot.prev);

                if let Some(slot) = self.slots[tail].as_mut() {
                    slot.next = idx;
                }
                if let Some(slot) = self.slots[head].as_mut() {
                    slot.prev = idx;
                }

                (tail, head)
            }
        };

        self.slots[idx] = Some(Slot { page, referenced: true, prev, next });
        self.slot_of.insert(page, idx);

        if self.hand.is_none() {
            self.hand = Some(idx);
        }
    }

    fn remove(&mut self, page: usize) -> bool {
        let Some(idx) = self.slot_of.remove(&page) else {
            return false;
        };
        let Some(slot) = self.slots[idx].take() else {
            return false;
        };

        self.free_slots.push(idx);

        if slot.next == idx {
            self.hand = None;
            return true;
        }

        if let Some(prev) = self.slots[slot.prev].as_mut() {
            prev.next = slot.next;
        }
        if let Some(next) = self.slots[slot.next].as_mut() {
            next.prev = slot.prev;
        }
        if self.hand == Some(idx) {
            self.hand = Some(slot.next);
        }

        true
    }

    fn set_referenced(&mut self, page: usize) {
        if let Some(&idx) = self.slot_of.get(&page) {
            if let Some(slot) = self.slots[idx].as_mut() {
                slot.referenced = true;
            }
        }
    }
}

impl PageReplacer for Clock {
    fn name(&self) -> &'static str {
        "CLOCK"
    }

    fn page_event(&mut self, event: PageEvent, _table: &mut PageTable) {
        match event {
            PageEvent::Loaded(page) => self.insert(page),
            PageEvent::Touched(page) => self.set_referenced(page),
            PageEvent::Evicted(page) => {
                self.remove(page);
            }
            PageEvent::Accessed { .. } => {}
        }
    }

    fn pick_replacement_page(&mut self, _line_index: usize, _table: &mut PageTable) -> Option<usize> {
        trace!("clock: sweeping {:?}", self.ring());

        // Two revolutions at most: the first clears every bit it passes.
        for _ in 0..=2 * self.len() {
            let idx = self.hand?;
            let slot = self.slots[idx].as_mut()?;

            if slot.referenced {
                slot.referenced = false;
                self.hand = Some(slot.next);
            } else {
                let page = slot.page;
                self.remove(page);
                return Some(page);
            }
        }

        None
    }
}
