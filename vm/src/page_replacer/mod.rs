//! Eviction policies.
//!
//! The [`Mmu`](crate::mmu::Mmu) feeds every replacer a stream of
//! [`PageEvent`]s and asks it for a victim once all frames are taken.
//! Replacers never touch the statistics; they only read (and, for NRU, age)
//! the page table.

mod clock;
mod nru;
mod opt;

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::address::MemoryAccess;
use crate::error::VmError;
use crate::page_table::PageTable;

pub use clock::Clock;
pub use nru::Nru;
pub use opt::{FutureUseIndex, Opt};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PageEvent {
    /// A valid access is about to be looked up.
    Accessed { line_index: usize },
    /// The page was already resident.
    Touched(usize),
    /// The page was just placed into a frame.
    Loaded(usize),
    /// The page was just removed from its frame.
    Evicted(usize),
}

pub trait PageReplacer {
    fn name(&self) -> &'static str;

    fn page_event(&mut self, _event: PageEvent, _table: &mut PageTable) {}

    /// Picks a resident page to evict. `None` means the replacer has no
    /// candidate at all.
    fn pick_replacement_page(&mut self, line_index: usize, table: &mut PageTable) -> Option<usize>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Opt,
    Nru,
    Clock,
}

impl Algorithm {
    pub fn needs_refresh_rate(&self) -> bool {
        matches!(self, Algorithm::Nru)
    }
}

impl FromStr for Algorithm {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opt" => Ok(Algorithm::Opt),
            "nru" => Ok(Algorithm::Nru),
            "clock" => Ok(Algorithm::Clock),
            other => Err(VmError::Configuration(format!(
                "unknown algorithm {other:?}, expected one of opt, nru, clock"
            ))),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Opt => "opt",
            Algorithm::Nru => "nru",
            Algorithm::Clock => "clock",
        };

        write!(f, "{}", name)
    }
}

/// The replacer picked at startup.
#[derive(Debug)]
pub enum Policy {
    Nru(Nru),
    Clock(Clock),
    Opt(Opt),
}

impl Policy {
    /// Builds the replacer for `algorithm`. OPT pre-scans `trace`; the other
    /// policies ignore it.
    pub fn build(
        algorithm: Algorithm,
        refresh_rate: Option<NonZeroUsize>,
        trace: &[MemoryAccess],
    ) -> crate::Result<Self> {
        match algorithm {
            Algorithm::Nru => {
                let refresh_rate = refresh_rate.ok_or_else(|| {
                    VmError::Configuration("nru needs a refresh rate (-r)".to_string())
                })?;

                Ok(Policy::Nru(Nru::new(refresh_rate)))
            }
            Algorithm::Clock => Ok(Policy::Clock(Clock::new())),
            Algorithm::Opt => Ok(Policy::Opt(Opt::new(FutureUseIndex::build(trace)))),
        }
    }

    fn inner(&mut self) -> &mut dyn PageReplacer {
        match self {
            Policy::Nru(nru) => nru,
            Policy::Clock(clock) => clock,
            Policy::Opt(opt) => opt,
        }
    }
}

impl PageReplacer for Policy {
    fn name(&self) -> &'static str {
        match self {
            Policy::Nru(nru) => nru.name(),
            Policy::Clock(clock) => clock.name(),
            Policy::Opt(opt) => opt.name(),
        }
    }

    fn page_event(&mut self, event: PageEvent, table: &mut PageTable) {
        self.inner().page_event(event, table)
    }

    fn pick_replacement_page(&mut self, line_index: usize, table: &mut PageTable) -> Option<usize> {
        self.inner().pick_replacement_page(line_index, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("opt".parse::<Algorithm>().unwrap(), Algorithm::Opt);
        assert_eq!("NRU".parse::<Algorithm>().unwrap(), Algorithm::Nru);
        assert_eq!("clock".parse::<Algorithm>().unwrap(), Algorithm::Clock);
        assert!(matches!("lru".parse::<Algorithm>(), Err(VmError::Configuration(_))));
    }

    #[test]
    fn test_algorithm_display_round_trips() {
        for algorithm in [Algorithm::Opt, Algorithm::Nru, Algorithm::Clock] {
            assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
        }
    }

    #[test]
    fn test_nru_policy_requires_refresh_rate() {
        assert!(matches!(
            Policy::build(Algorithm::Nru, None, &[]),
            Err(VmError::Configuration(_))
        ));

        let policy = Policy::build(Algorithm::Nru, NonZeroUsize::new(4), &[]).unwrap();
        assert_eq!(policy.name(), "NRU");
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(Policy::build(Algorithm::Clock, None, &[]).unwrap().name(), "CLOCK");
        assert_eq!(Policy::build(Algorithm::Opt, None, &[]).unwrap().name(), "OPT");
    }
}
