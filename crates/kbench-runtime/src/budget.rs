use core::fmt;

use crate::error::RuntimeError;

/// Number of workers assigned to one parallel region. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadBudget(usize);

impl ThreadBudget {
    pub const ONE: ThreadBudget = ThreadBudget(1);

    pub fn new(workers: usize) -> Result<Self, RuntimeError> {
        if workers == 0 {
            return Err(RuntimeError::InvalidArgument(
                "thread count must be at least 1".into(),
            ));
        }
        Ok(ThreadBudget(workers))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Per-part share when this budget is divided among `parts` concurrent
    /// tasks: `max(1, self / parts)`.
    pub fn split(self, parts: usize) -> ThreadBudget {
        match parts {
            0 => self,
            _ => ThreadBudget((self.0 / parts).max(1)),
        }
    }

    /// Outer/inner pair for a two-level region whose product stays within
    /// this budget.
    pub fn nest(self) -> NestedBudget {
        let outer = ThreadBudget(isqrt(self.0).max(1));
        NestedBudget {
            outer,
            inner: self.split(outer.0),
        }
    }
}

impl fmt::Display for ThreadBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Budgets for a two-level region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NestedBudget {
    pub outer: ThreadBudget,
    pub inner: ThreadBudget,
}

impl NestedBudget {
    pub fn total(&self) -> usize {
        self.outer.0 * self.inner.0
    }
}

fn isqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r.checked_mul(r).map_or(true, |sq| sq > n) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= n) {
        r += 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_budget_rejected() {
        assert!(matches!(
            ThreadBudget::new(0),
            Err(RuntimeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_split_matches_section_rule() {
        let t = ThreadBudget::new(8).unwrap();
        assert_eq!(t.split(4).get(), 2);
        assert_eq!(ThreadBudget::new(3).unwrap().split(4).get(), 1);
        assert_eq!(ThreadBudget::new(9).unwrap().split(4).get(), 2);
    }

    #[test]
    fn test_nest_four() {
        let nb = ThreadBudget::new(4).unwrap().nest();
        assert_eq!((nb.outer.get(), nb.inner.get()), (2, 2));
    }

    #[test]
    fn test_nest_largest_budget() {
        let nb = ThreadBudget::new(usize::MAX).unwrap().nest();
        let outer = nb.outer.get();
        assert!(outer.checked_mul(outer).is_some());
        assert!((outer + 1).checked_mul(outer + 1).is_none());
        assert!(outer.checked_mul(nb.inner.get()).is_some());
    }

    proptest! {
        #[test]
        fn prop_nested_product_within_budget(t in 1usize..512) {
            let nb = ThreadBudget::new(t).unwrap().nest();
            prop_assert!(nb.outer.get() >= 1 && nb.inner.get() >= 1);
            prop_assert!(nb.total() <= t);
        }

        #[test]
        fn prop_split_never_zero(t in 1usize..512, parts in 1usize..64) {
            let inner = ThreadBudget::new(t).unwrap().split(parts);
            prop_assert_eq!(inner.get(), (t / parts).max(1));
            // Rounding up to one worker per part is the only overshoot.
            prop_assert!(inner.get() * parts <= t + parts - 1);
        }
    }
}
