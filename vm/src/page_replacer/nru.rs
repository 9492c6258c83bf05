use std::num::NonZeroUsize;

use log::trace;

use super::{PageEvent, PageReplacer};
use crate::page_table::PageTable;

/// Not Recently Used.
///
/// Reference bits are cleared on every access whose line index is a multiple
/// of the refresh rate. Victims come from the lowest non-empty class of
/// `(referenced, dirty)`, first in frame order.
#[derive(Debug)]
pub struct Nru {
    refresh_rate: NonZeroUsize,
}

impl Nru {
    pub fn new(refresh_rate: NonZeroUsize) -> Self {
        Nru { refresh_rate }
    }

    fn class(referenced: bool, dirty: bool) -> usize {
        (referenced as usize) << 1 | dirty as usize
    }
}

impl PageReplacer for Nru {
    fn name(&self) -> &'static str {
        "NRU"
    }

    fn page_event(&mut self, event: PageEvent, table: &mut PageTable) {
        if let PageEvent::Accessed { line_index } = event {
            if line_index % self.refresh_rate.get() == 0 {
                trace!("nru: line {} clears reference bits", line_index);
                table.clear_reference_bits();
            }
        }
    }

    fn pick_replacement_page(&mut self, _line_index: usize, table: &mut PageTable) -> Option<usize> {
        let mut first_in_class: [Option<usize>; 4] = [None; 4];

        for page_number in table.resident_pages() {
            let entry = table.lookup(page_number)?;
            let class = Self::class(entry.referenced, entry.dirty);

            if class == 0 {
                return Some(page_number);
            }

            first_in_class[class].get_or_insert(page_number);
        }

        first_in_class.into_iter().flatten().next()
    }
}
