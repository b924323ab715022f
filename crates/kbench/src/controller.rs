//! Chooses which loop level of the multiply gets the workers.

use core::fmt;

use kernels::{Granularity, LoopPlan, Matrix};
use runtime::{Runtime, RuntimeConfig, RuntimeConfigBuilder, ThreadBudget};
use tracing::{debug, info};

use crate::error::BenchError;

/// Nesting depth the nested granularity needs.
pub const NESTED_LEVELS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Unconfigured,
    NestingEnabled,
    Ready,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControllerState::Unconfigured => "unconfigured",
            ControllerState::NestingEnabled => "nesting-enabled",
            ControllerState::Ready => "ready",
        })
    }
}

/// Owns the worker team for a sweep of multiply variants and turns a
/// [`Granularity`] into a concrete [`LoopPlan`] under the thread ceiling.
///
/// Configuration goes `enable_nesting` then `set_thread_ceiling`; after that
/// `run_variant` may be called any number of times.
pub struct GranularityController {
    config: RuntimeConfig,
    state: ControllerState,
    runtime: Option<Runtime>,
}

impl GranularityController {
    pub fn new(config: RuntimeConfig) -> Self {
        GranularityController {
            config,
            state: ControllerState::Unconfigured,
            runtime: None,
        }
    }

    /// Controller taken straight to `Ready` with the ceiling in `config` and
    /// at least two active nesting levels.
    pub fn ready(config: RuntimeConfig) -> Result<Self, BenchError> {
        let depth = config.max_active_levels.max(NESTED_LEVELS);
        let threads = config.max_threads;
        let mut controller = Self::new(config);
        controller.enable_nesting(depth)?;
        controller.set_thread_ceiling(threads)?;
        Ok(controller)
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn enable_nesting(&mut self, max_depth: usize) -> Result<(), BenchError> {
        self.require(ControllerState::Unconfigured)?;
        if max_depth == 0 {
            return Err(BenchError::InvalidArgument(
                "nesting depth must be at least 1".into(),
            ));
        }
        self.config.max_active_levels = max_depth;
        self.state = ControllerState::NestingEnabled;
        Ok(())
    }

    /// Builds the worker team. May be repeated once `Ready` to resize it.
    pub fn set_thread_ceiling(&mut self, threads: usize) -> Result<(), BenchError> {
        if self.state == ControllerState::Unconfigured {
            return Err(BenchError::InvalidState {
                state: self.state,
                expected: ControllerState::NestingEnabled,
            });
        }
        let ceiling = ThreadBudget::new(threads)?;
        let config = RuntimeConfigBuilder::default()
            .max_threads(ceiling.get())
            .max_active_levels(self.config.max_active_levels)
            .build()?;
        let runtime = Runtime::new(config.clone())?;
        info!(
            threads = ceiling.get(),
            max_active_levels = config.max_active_levels,
            "controller ready"
        );
        self.config = config;
        self.runtime = Some(runtime);
        self.state = ControllerState::Ready;
        Ok(())
    }

    pub fn runtime(&self) -> Result<&Runtime, BenchError> {
        self.runtime.as_ref().ok_or(BenchError::InvalidState {
            state: self.state,
            expected: ControllerState::Ready,
        })
    }

    /// Worker budgets for `granularity` under the current ceiling. Nested
    /// plans keep `outer * inner` within the ceiling.
    pub fn plan(&self, granularity: Granularity) -> Result<LoopPlan, BenchError> {
        let ceiling = self.runtime()?.ceiling();
        Ok(match granularity {
            Granularity::Outer => LoopPlan::Outer(ceiling),
            Granularity::Inner => LoopPlan::Inner(ceiling),
            Granularity::Nested => LoopPlan::Nested(ceiling.nest()),
        })
    }

    pub fn run_variant(
        &self,
        granularity: Granularity,
        a: &Matrix,
        b: &Matrix,
    ) -> Result<Matrix, BenchError> {
        let plan = self.plan(granularity)?;
        debug!(?plan, "running variant");
        Ok(kernels::multiply(self.runtime()?, a, b, plan)?)
    }

    fn require(&self, expected: ControllerState) -> Result<(), BenchError> {
        if self.state != expected {
            return Err(BenchError::InvalidState {
                state: self.state,
                expected,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernels::ops::mul_seq;

    #[test]
    fn test_state_machine_order() {
        let mut c = GranularityController::new(RuntimeConfig::default());
        assert_eq!(c.state(), ControllerState::Unconfigured);
        assert!(matches!(
            c.set_thread_ceiling(4),
            Err(BenchError::InvalidState { .. })
        ));
        c.enable_nesting(2).unwrap();
        assert_eq!(c.state(), ControllerState::NestingEnabled);
        assert!(c.enable_nesting(2).is_err());
        c.set_thread_ceiling(4).unwrap();
        assert_eq!(c.state(), ControllerState::Ready);
        c.set_thread_ceiling(2).unwrap();
        assert_eq!(c.runtime().unwrap().config().max_threads, 2);
        assert_eq!(c.runtime().unwrap().config().max_active_levels, 2);
    }

    #[test]
    fn test_not_ready_rejects_variants() {
        let mut c = GranularityController::new(RuntimeConfig::default());
        c.enable_nesting(2).unwrap();
        let m = Matrix::zeros(2).unwrap();
        assert!(matches!(
            c.run_variant(Granularity::Outer, &m, &m),
            Err(BenchError::InvalidState {
                expected: ControllerState::Ready,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let mut c = GranularityController::new(RuntimeConfig::default());
        c.enable_nesting(2).unwrap();
        assert!(c.set_thread_ceiling(0).is_err());
        assert_eq!(c.state(), ControllerState::NestingEnabled);
    }

    #[test]
    fn test_nested_plan_within_ceiling() {
        for t in 1..=16 {
            let c = GranularityController::ready(RuntimeConfig::with_threads(t)).unwrap();
            let plan = c.plan(Granularity::Nested).unwrap();
            assert!(plan.workers() <= t, "{t}: {plan:?}");
            assert_eq!(c.plan(Granularity::Outer).unwrap().workers(), t);
        }
    }

    #[test]
    fn test_variants_reusable_and_bounded() {
        let c = GranularityController::ready(RuntimeConfig::with_threads(4)).unwrap();
        let a = Matrix::random(24, 3).unwrap();
        let b = Matrix::random(24, 4).unwrap();
        let expected = mul_seq(&a, &b).unwrap();
        let rt = c.runtime().unwrap();
        for _ in 0..2 {
            for g in Granularity::ALL {
                rt.reset_peak();
                assert_eq!(c.run_variant(g, &a, &b).unwrap(), expected);
                assert!(rt.peak_active() <= 4, "{g}");
            }
        }
    }
}
