//! Definite integrals by the midpoint rectangle rule.

use core::fmt;
use core::str::FromStr;

use runtime::{Runtime, ThreadBudget};
use tracing::debug;

use crate::accumulate::{AtomicF64, LockedSum, SharedSum, Strategy};
use crate::error::KernelError;

/// Built-in integrands; both integrate to π over `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Integrand {
    /// `4 / (1 + x²)`
    #[default]
    Arctan,
    /// `4 · √(1 − x²)`, the unit circle's first quadrant scaled by four.
    QuarterCircle,
}

impl Integrand {
    pub const ALL: [Integrand; 2] = [Integrand::Arctan, Integrand::QuarterCircle];

    #[inline]
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Integrand::Arctan => 4.0 / (1.0 + x * x),
            Integrand::QuarterCircle => 4.0 * (1.0 - x * x).max(0.0).sqrt(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Integrand::Arctan => "arctan",
            Integrand::QuarterCircle => "quarter-circle",
        }
    }
}

impl fmt::Display for Integrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Integrand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Integrand::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown integrand `{s}`"))
    }
}

/// `steps` equal sub-intervals of `[lo, hi]`, sampled at their midpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    lo: f64,
    width: f64,
    steps: usize,
}

impl Grid {
    pub fn new(lo: f64, hi: f64, steps: usize) -> Result<Self, KernelError> {
        if steps == 0 {
            return Err(KernelError::InvalidArgument("steps must be positive".into()));
        }
        if !lo.is_finite() || !hi.is_finite() || hi < lo {
            return Err(KernelError::InvalidArgument(format!(
                "invalid interval [{lo}, {hi}]"
            )));
        }
        Ok(Grid {
            lo,
            width: (hi - lo) / steps as f64,
            steps,
        })
    }

    /// `[0, 1]` split into `steps` rectangles.
    pub fn unit(steps: usize) -> Result<Self, KernelError> {
        Self::new(0.0, 1.0, steps)
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn midpoint(&self, i: usize) -> f64 {
        self.lo + (i as f64 + 0.5) * self.width
    }
}

/// Rectangle-rule estimate of `∫ f` over `grid` with the given strategy.
///
/// `Sequential` ignores `budget`. The other strategies open one region of
/// `budget` workers over contiguous index ranges.
pub fn integrate<F>(
    rt: &Runtime,
    f: F,
    grid: Grid,
    budget: ThreadBudget,
    strategy: Strategy,
) -> Result<f64, KernelError>
where
    F: Fn(f64) -> f64 + Sync,
{
    debug!(steps = grid.steps, workers = budget.get(), %strategy, "integrate");
    let sum = match strategy {
        Strategy::Sequential => (0..grid.steps).fold(0.0, |acc, i| acc + f(grid.midpoint(i))),
        Strategy::Reduction => rt
            .map_ranges(grid.steps, budget, |_, range| {
                range.fold(0.0, |acc, i| acc + f(grid.midpoint(i)))
            })?
            .into_iter()
            .fold(0.0, |acc, partial| acc + partial),
        Strategy::Atomic => shared(rt, &f, grid, budget, AtomicF64::new(0.0))?,
        Strategy::Critical => shared(rt, &f, grid, budget, LockedSum::new(0.0))?,
    };
    Ok(grid.width * sum)
}

/// Same as [`integrate`] for one of the built-in integrands on `[0, 1]`.
pub fn integrate_unit(
    rt: &Runtime,
    integrand: Integrand,
    steps: usize,
    budget: ThreadBudget,
    strategy: Strategy,
) -> Result<f64, KernelError> {
    integrate(rt, |x| integrand.eval(x), Grid::unit(steps)?, budget, strategy)
}

fn shared<F, S>(rt: &Runtime, f: &F, grid: Grid, budget: ThreadBudget, sum: S) -> Result<f64, KernelError>
where
    F: Fn(f64) -> f64 + Sync,
    S: SharedSum,
{
    rt.map_ranges(grid.steps, budget, |_, range| {
        for i in range {
            sum.add(f(grid.midpoint(i)));
        }
    })?;
    Ok(sum.total())
}

/// Acceptable gap between a parallel estimate and the sequential one.
///
/// Reordering `steps` additions of terms bounded by `max_term` can move the
/// sum by about `steps · ε · max_term`; the estimate is that sum times the
/// step width.
pub fn tolerance(grid: &Grid, max_term: f64) -> f64 {
    let sum_bound = grid.steps as f64 * max_term.abs();
    (grid.steps as f64 * f64::EPSILON * sum_bound * grid.width).max(1e-12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;
    use runtime::RuntimeConfig;

    #[test]
    fn test_every_strategy_converges_to_pi() {
        let rt = Runtime::new(RuntimeConfig::with_threads(4)).unwrap();
        let budget = ThreadBudget::new(4).unwrap();
        for strategy in Strategy::ALL {
            let pi = integrate_unit(&rt, Integrand::Arctan, 1_000_000, budget, strategy).unwrap();
            assert!((pi - PI).abs() < 1e-6, "{strategy}: {pi}");
        }
    }

    #[test]
    fn test_quarter_circle_converges() {
        let rt = Runtime::new(RuntimeConfig::with_threads(2)).unwrap();
        let budget = ThreadBudget::new(2).unwrap();
        let pi = integrate_unit(&rt, Integrand::QuarterCircle, 200_000, budget, Strategy::Reduction)
            .unwrap();
        assert!((pi - PI).abs() < 1e-6, "{pi}");
    }

    #[test]
    fn test_strategies_agree_with_sequential() {
        let rt = Runtime::new(RuntimeConfig::with_threads(6)).unwrap();
        let grid = Grid::unit(100_000).unwrap();
        let f = |x: f64| Integrand::Arctan.eval(x);
        let seq = integrate(&rt, f, grid, ThreadBudget::ONE, Strategy::Sequential).unwrap();
        let eps = tolerance(&grid, 4.0);
        for t in 1..=6 {
            let budget = ThreadBudget::new(t).unwrap();
            for strategy in Strategy::PARALLEL {
                let v = integrate(&rt, f, grid, budget, strategy).unwrap();
                assert!((v - seq).abs() < eps, "{strategy} x{t}: {v} vs {seq}");
            }
        }
    }

    #[test]
    fn test_repeated_calls_agree() {
        let rt = Runtime::new(RuntimeConfig::with_threads(4)).unwrap();
        let grid = Grid::unit(50_000).unwrap();
        let budget = ThreadBudget::new(4).unwrap();
        let f = |x: f64| Integrand::QuarterCircle.eval(x);
        // Sequential and reduction sum in a fixed order; atomic and critical
        // depend on arrival order, so they only agree within tolerance.
        for strategy in Strategy::ALL {
            let first = integrate(&rt, f, grid, budget, strategy).unwrap();
            let second = integrate(&rt, f, grid, budget, strategy).unwrap();
            match strategy {
                Strategy::Sequential | Strategy::Reduction => {
                    assert_eq!(first.to_bits(), second.to_bits(), "{strategy}")
                }
                Strategy::Atomic | Strategy::Critical => {
                    assert!((first - second).abs() <= tolerance(&grid, 4.0), "{strategy}")
                }
            }
        }
    }

    #[test]
    fn test_single_worker_reduction_is_exact() {
        let rt = Runtime::new(RuntimeConfig::with_threads(1)).unwrap();
        let grid = Grid::unit(10_000).unwrap();
        let f = |x: f64| Integrand::Arctan.eval(x);
        let seq = integrate(&rt, f, grid, ThreadBudget::ONE, Strategy::Sequential).unwrap();
        let red = integrate(&rt, f, grid, ThreadBudget::ONE, Strategy::Reduction).unwrap();
        assert_eq!(seq.to_bits(), red.to_bits());
    }

    #[test]
    fn test_error_shrinks_with_steps() {
        let rt = Runtime::new(RuntimeConfig::with_threads(2)).unwrap();
        let budget = ThreadBudget::new(2).unwrap();
        let coarse = integrate_unit(&rt, Integrand::Arctan, 10, budget, Strategy::Reduction).unwrap();
        let fine = integrate_unit(&rt, Integrand::Arctan, 1000, budget, Strategy::Reduction).unwrap();
        assert!((fine - PI).abs() < (coarse - PI).abs());
    }

    #[test]
    fn test_polynomial_on_custom_interval() {
        let rt = Runtime::new(RuntimeConfig::with_threads(3)).unwrap();
        let grid = Grid::new(1.0, 3.0, 3000).unwrap();
        let v = integrate(&rt, |x| x, grid, ThreadBudget::new(3).unwrap(), Strategy::Atomic).unwrap();
        assert!((v - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_integrand_names_parse() {
        for i in Integrand::ALL {
            assert_eq!(i.name().parse::<Integrand>().unwrap(), i);
        }
        assert!("sine".parse::<Integrand>().is_err());
    }

    #[test]
    fn test_invalid_grid() {
        assert!(matches!(Grid::unit(0), Err(KernelError::InvalidArgument(_))));
        assert!(Grid::new(2.0, 1.0, 10).is_err());
        assert!(Grid::new(0.0, f64::INFINITY, 10).is_err());
    }
}
