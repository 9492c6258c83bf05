use std::collections::{BTreeSet, HashMap};
use std::ops::Bound::{Excluded, Unbounded};

use log::trace;

use super::{PageEvent, PageReplacer};
use crate::address::MemoryAccess;
use crate::page_table::PageTable;

/// Every line index at which each page is accessed, gathered from a full
/// pass over the trace before replay starts.
#[derive(Debug, Default)]
pub struct FutureUseIndex {
    uses: HashMap<usize, BTreeSet<usize>>,
}

impl FutureUseIndex {
    pub fn build(trace: &[MemoryAccess]) -> Self {
        let mut uses: HashMap<usize, BTreeSet<usize>> = HashMap::new();

        for access in trace {
            // pages past usize can never be resident
            let Ok(page) = usize::try_from(access.page_number) else {
                continue;
            };

            uses.entry(page).or_default().insert(access.line_index);
        }

        FutureUseIndex { uses }
    }

    /// Smallest recorded line index strictly after `line_index`.
    pub fn next_use(&self, page: usize, line_index: usize) -> Option<usize> {
        self.uses
            .get(&page)?
            .range((Excluded(line_index), Unbounded))
            .next()
            .copied()
    }

    /// Forgets uses of `page` at or before `line_index`, and the page itself
    /// once nothing is left.
    pub fn trim(&mut self, page: usize, line_index: usize) {
        let Some(lines) = self.uses.get_mut(&page) else {
            return;
        };

        *lines = match line_index.checked_add(1) {
            Some(first_kept) => lines.split_off(&first_kept),
            None => BTreeSet::new(),
        };

        if lines.is_empty() {
            self.uses.remove(&page);
        }
    }

    pub fn is_tracked(&self, page: usize) -> bool {
        self.uses.contains_key(&page)
    }

    pub fn tracked_pages(&self) -> usize {
        self.uses.len()
    }
}

/// Belady's optimal replacement. Evicts a page that is never used again if
/// there is one, otherwise the page whose next use is farthest away.
#[derive(Debug)]
pub struct Opt {
    index: FutureUseIndex,
    current_line: usize,
}

impl Opt {
    pub fn new(index: FutureUseIndex) -> Self {
        Opt { index, current_line: 0 }
    }

    pub fn index(&self) -> &FutureUseIndex {
        &self.index
    }
}

impl PageReplacer for Opt {
    fn name(&self) -> &'static str {
        "OPT"
    }

    fn page_event(&mut self, event: PageEvent, _table: &mut PageTable) {
        match event {
            PageEvent::Accessed { line_index } => self.current_line = line_index,
            PageEvent::Evicted(page) => self.index.trim(page, self.current_line),
            PageEvent::Touched(_) | PageEvent::Loaded(_) => {}
        }
    }

    fn pick_replacement_page(&mut self, line_index: usize, table: &mut PageTable) -> Option<usize> {
        let mut farthest: Option<(usize, usize)> = None;

        for page in table.resident_pages() {
            match self.index.next_use(page, line_index) {
                None => {
                    trace!("opt: page {:#X} is never used again", page);
                    return Some(page);
                }
                Some(next) => {
                    trace!("opt: page {:#X} next used at line {}", page, next);

                    if farthest.map_or(true, |(_, far)| next > far) {
                        farthest = Some((page, next));
                    }
                }
            }
        }

        farthest.map(|(page, _)| page)
    }
}
