use std::fmt;

use log::{debug, error, warn};

use crate::address::{MemoryAccess, PAGE_TABLE_ENTRIES};
use crate::error::{Result, VmError};
use crate::page_replacer::{PageEvent, PageReplacer};
use crate::page_table::PageTable;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    pub algorithm: &'static str,
    pub frames: usize,
    pub total_accesses: u64,
    pub page_faults: u64,
    pub writes: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Algorithm: {}", self.algorithm)?;
        writeln!(f, "Number of frames: {}", self.frames)?;
        writeln!(f, "Total memory accesses: {}", self.total_accesses)?;
        writeln!(f, "Total page faults: {}", self.page_faults)?;
        write!(f, "Total writes to disk: {}", self.writes)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Eviction {
    pub page: usize,
    pub frame_index: usize,
    pub dirty: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    Fault { evicted: Option<Eviction> },
}

/// Replays accesses against a fixed number of frames.
pub struct Mmu<REPLACER: PageReplacer> {
    page_table: PageTable,
    replacer: REPLACER,
    stats: Stats,
}

impl<REPLACER> Mmu<REPLACER>
where
    REPLACER: PageReplacer,
{
    /// An MMU over the full 32-bit address space.
    pub fn new(frame_count: usize, replacer: REPLACER) -> Self {
        Self::with_page_count(frame_count, PAGE_TABLE_ENTRIES, replacer)
    }

    pub fn with_page_count(frame_count: usize, page_count: usize, replacer: REPLACER) -> Self {
        let stats = Stats {
            algorithm: replacer.name(),
            frames: frame_count,
            total_accesses: 0,
            page_faults: 0,
            writes: 0,
        };

        Mmu {
            page_table: PageTable::new(page_count, frame_count),
            replacer,
            stats,
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn replacer(&self) -> &REPLACER {
        &self.replacer
    }

    fn invariant_violation(&self, line_index: usize, what: String) -> VmError {
        VmError::PolicyInvariantViolation(format!(
            "line {}: {} ({} of {} frames in use)",
            line_index,
            what,
            self.page_table.resident_count(),
            self.page_table.frame_count()
        ))
    }

    fn handle_page_fault(&mut self, access: &MemoryAccess, page_number: usize) -> Result<Option<Eviction>> {
        let line_index = access.line_index;

        let evicted = if self.page_table.has_free_frame() {
            None
        } else {
            let victim = match self.replacer.pick_replacement_page(line_index, &mut self.page_table) {
                Some(victim) => victim,
                None => {
                    let what = format!("{} found no victim", self.replacer.name());
                    return Err(self.invariant_violation(line_index, what));
                }
            };

            let entry = match self.page_table.evict(victim) {
                Some(entry) => entry,
                None => {
                    let what = format!("{} picked page {:#X}, which is not resident", self.replacer.name(), victim);
                    return Err(self.invariant_violation(line_index, what));
                }
            };

            self.replacer.page_event(PageEvent::Evicted(victim), &mut self.page_table);

            if entry.dirty {
                debug!("mmu: page {:#X} is dirty, writing back", victim);
                self.stats.writes += 1;
            }

            debug!("mmu: evicted page {:#X} from frame {}", victim, entry.frame_index);

            Some(Eviction {
                page: victim,
                frame_index: entry.frame_index,
                dirty: entry.dirty,
            })
        };

        let frame_index = match self.page_table.allocate(page_number, access.kind) {
            Some(frame_index) => frame_index,
            None => {
                let what = format!("no frame for page {:#X} after eviction", page_number);
                return Err(self.invariant_violation(line_index, what));
            }
        };

        self.replacer.page_event(PageEvent::Loaded(page_number), &mut self.page_table);

        debug!(
            "mmu: {} type: address {:#X}, page {:#X} offset {:#X} loaded into frame {}",
            access.kind, access.address, page_number, access.offset, frame_index
        );

        Ok(evicted)
    }

    /// Replays a single access.
    ///
    /// Out-of-range pages are rejected before any counter moves. A replacer
    /// that cannot name a resident victim once every frame is in use is a
    /// fatal error.
    pub fn access(&mut self, access: &MemoryAccess) -> Result<AccessOutcome> {
        let page_number = usize::try_from(access.page_number)
            .ok()
            .filter(|page| *page < self.page_table.page_count())
            .ok_or(VmError::OutOfRangeAddress {
                line: access.line_index,
                page: access.page_number,
            })?;

        self.replacer.page_event(
            PageEvent::Accessed { line_index: access.line_index },
            &mut self.page_table,
        );

        self.stats.total_accesses += access.kind.weight();

        let outcome = if self.page_table.is_resident(page_number) {
            debug!("mmu: line {} page {:#X} hit", access.line_index, page_number);

            self.page_table.touch(page_number);
            self.replacer.page_event(PageEvent::Touched(page_number), &mut self.page_table);

            AccessOutcome::Hit
        } else {
            debug!("mmu: line {} page {:#X} fault", access.line_index, page_number);

            self.stats.page_faults += 1;
            let evicted = self.handle_page_fault(access, page_number)?;

            AccessOutcome::Fault { evicted }
        };

        debug_assert!(self.page_table.resident_count() <= self.page_table.frame_count());

        Ok(outcome)
    }

    /// Replays a whole trace in order, skipping records that cannot be
    /// placed in the page table.
    pub fn run(&mut self, trace: &[MemoryAccess]) -> Result<Stats> {
        for access in trace {
            match self.access(access) {
                Ok(_) => {}
                Err(err) if err.is_recoverable() => warn!("mmu: skipping record: {}", err),
                Err(err) => {
                    error!("mmu: aborting replay: {}", err);
                    return Err(err);
                }
            }
        }

        Ok(self.stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::address::{AccessKind, PAGE_SIZE};
    use crate::page_replacer::{Clock, Nru};

    /// Hands back a fixed victim, resident or not.
    struct Fixed(Option<usize>);

    impl PageReplacer for Fixed {
        fn name(&self) -> &'static str {
            "FIXED"
        }

        fn pick_replacement_page(&mut self, _line_index: usize, _table: &mut PageTable) -> Option<usize> {
            self.0
        }
    }

    fn access(line: usize, kind: AccessKind, page: u64) -> MemoryAccess {
        MemoryAccess::new(line, kind, page * PAGE_SIZE)
    }

    #[test]
    fn test_hit_after_fault() {
        let mut mmu = Mmu::with_page_count(2, 16, Clock::new());

        assert!(matches!(
            mmu.access(&access(0, AccessKind::Load, 3)).unwrap(),
            AccessOutcome::Fault { evicted: None }
        ));
        assert_eq!(mmu.access(&access(1, AccessKind::Store, 3)).unwrap(), AccessOutcome::Hit);

        assert_eq!(mmu.stats().page_faults, 1);
        assert_eq!(mmu.stats().total_accesses, 2);
        assert!(!mmu.page_table().lookup(3).unwrap().dirty);
    }

    #[test]
    fn test_modify_counts_twice() {
        let mut mmu = Mmu::with_page_count(2, 16, Clock::new());

        mmu.access(&access(0, AccessKind::Modify, 1)).unwrap();
        mmu.access(&access(1, AccessKind::Modify, 1)).unwrap();

        assert_eq!(mmu.stats().total_accesses, 4);
        assert_eq!(mmu.stats().page_faults, 1);
    }

    #[test]
    fn test_out_of_range_is_rejected_without_counting() {
        let mut mmu = Mmu::with_page_count(2, 16, Clock::new());

        let err = mmu.access(&access(0, AccessKind::Load, 16)).unwrap_err();

        assert!(matches!(err, VmError::OutOfRangeAddress { line: 0, page: 16 }));
        assert_eq!(mmu.stats().total_accesses, 0);
        assert_eq!(mmu.stats().page_faults, 0);
    }

    #[test]
    fn test_dirty_eviction_counts_write() {
        let mut mmu = Mmu::with_page_count(1, 16, Nru::new(NonZeroUsize::new(10).unwrap()));

        mmu.access(&access(0, AccessKind::Store, 0)).unwrap();
        let outcome = mmu.access(&access(1, AccessKind::Load, 1)).unwrap();

        assert_eq!(
            outcome,
            AccessOutcome::Fault {
                evicted: Some(Eviction { page: 0, frame_index: 0, dirty: true })
            }
        );
        assert_eq!(mmu.stats().writes, 1);
    }

    #[test]
    fn test_missing_victim_is_fatal() {
        let mut mmu = Mmu::with_page_count(1, 16, Fixed(None));

        mmu.access(&access(0, AccessKind::Load, 0)).unwrap();
        let err = mmu.access(&access(1, AccessKind::Load, 1)).unwrap_err();

        assert!(matches!(err, VmError::PolicyInvariantViolation(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_non_resident_victim_is_fatal() {
        let mut mmu = Mmu::with_page_count(1, 16, Fixed(Some(7)));

        mmu.access(&access(0, AccessKind::Load, 0)).unwrap();

        assert!(matches!(
            mmu.access(&access(1, AccessKind::Load, 1)),
            Err(VmError::PolicyInvariantViolation(_))
        ));
    }

    #[test]
    fn test_run_skips_out_of_range_and_aborts_on_fatal() {
        let trace = vec![
            access(0, AccessKind::Load, 0),
            access(1, AccessKind::Load, 99),
            access(2, AccessKind::Load, 0),
        ];
        let mut mmu = Mmu::with_page_count(1, 16, Clock::new());
        let stats = mmu.run(&trace).unwrap();

        assert_eq!(stats.total_accesses, 2);
        assert_eq!(stats.page_faults, 1);

        let trace = vec![access(0, AccessKind::Load, 0), access(1, AccessKind::Load, 1)];
        let mut mmu = Mmu::with_page_count(1, 16, Fixed(None));

        assert!(mmu.run(&trace).is_err());
    }

    #[test]
    fn test_stats_summary() {
        let stats = Stats {
            algorithm: "CLOCK",
            frames: 8,
            total_accesses: 10,
            page_faults: 4,
            writes: 1,
        };

        assert_eq!(
            stats.to_string(),
            "Algorithm: CLOCK\nNumber of frames: 8\nTotal memory accesses: 10\nTotal page faults: 4\nTotal writes to disk: 1"
        );
    }
}
