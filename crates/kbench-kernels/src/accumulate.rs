//! Ways of combining contributions from concurrent workers into one sum.

use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// How the integration kernel combines per-iteration contributions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Single thread, no region at all. The baseline.
    Sequential,
    /// Private partial sum per worker, merged after the barrier.
    Reduction,
    /// Every contribution added with one atomic read-modify-write.
    Atomic,
    /// Every contribution added under one lock.
    Critical,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Sequential,
        Strategy::Reduction,
        Strategy::Atomic,
        Strategy::Critical,
    ];

    /// The strategies that actually run a parallel region.
    pub const PARALLEL: [Strategy; 3] = [Strategy::Reduction, Strategy::Atomic, Strategy::Critical];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Reduction => "reduction",
            Strategy::Atomic => "atomic",
            Strategy::Critical => "critical",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|st| st.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown strategy `{s}`"))
    }
}

/// A scalar sum that any number of workers may add to at the same time.
pub trait SharedSum: Sync {
    fn add(&self, value: f64);

    /// Current total. Only meaningful once every writer has finished.
    fn total(&self) -> f64;
}

/// `f64` stored as its bit pattern in an `AtomicU64`.
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        AtomicF64(AtomicU64::new(value.to_bits()))
    }

    /// Adds `value` and returns the previous total.
    pub fn fetch_add(&self, value: f64) -> f64 {
        let prev = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        match prev {
            Ok(bits) | Err(bits) => f64::from_bits(bits),
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

impl SharedSum for AtomicF64 {
    fn add(&self, value: f64) {
        self.fetch_add(value);
    }

    fn total(&self) -> f64 {
        self.load()
    }
}

/// Sum guarded by a mutex; each `add` is one critical section.
#[derive(Debug, Default)]
pub struct LockedSum(Mutex<f64>);

impl LockedSum {
    pub fn new(value: f64) -> Self {
        LockedSum(Mutex::new(value))
    }
}

impl SharedSum for LockedSum {
    fn add(&self, value: f64) {
        // A poisoned lock still holds a valid f64.
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += value;
    }

    fn total(&self) -> f64 {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn hammer(sum: &dyn SharedSum) {
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..10_000 {
                        sum.add(0.5);
                    }
                });
            }
        });
    }

    #[test]
    fn test_atomic_no_lost_updates() {
        let sum = AtomicF64::new(0.0);
        hammer(&sum);
        assert_eq!(sum.total(), 40_000.0);
    }

    #[test]
    fn test_locked_no_lost_updates() {
        let sum = LockedSum::new(0.0);
        hammer(&sum);
        assert_eq!(sum.total(), 40_000.0);
    }

    #[test]
    fn test_fetch_add_returns_previous() {
        let a = AtomicF64::new(1.5);
        assert_eq!(a.fetch_add(2.0), 1.5);
        assert_eq!(a.load(), 3.5);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Atomic".parse::<Strategy>().unwrap(), Strategy::Atomic);
        assert_eq!("reduction".parse::<Strategy>().unwrap(), Strategy::Reduction);
        assert!("barrier".parse::<Strategy>().is_err());
    }
}
