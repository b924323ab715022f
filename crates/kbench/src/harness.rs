//! The benchmark programs. Each one builds its inputs, times a sequential
//! baseline and then every parallel variant, validates the variants against
//! the baseline and collects one report line per measurement.
//!
//! Only setup problems (bad sizes, inputs that cannot be allocated, a team
//! that cannot be built) are returned as errors. A variant that fails or
//! misses its tolerance becomes a failure line and the sweep moves on.

use kernels::daxpy::{daxpy, daxpy_seq, vector};
use kernels::integrate::tolerance;
use kernels::ops::mul_seq;
use kernels::{integrate, Granularity, Grid, Integrand, KernelError, Matrix, MatrixOp, Strategy};
use runtime::{Runtime, RuntimeConfigBuilder, ThreadBudget};
use tracing::{info, warn};

use crate::controller::{GranularityController, NESTED_LEVELS};
use crate::error::BenchError;
use crate::report::Report;
use crate::sections::{DispatchReport, SectionDispatcher, DEFAULT_SECTIONS};
use crate::timing::{timed, Speedup, TimingRecord};

pub const DEFAULT_PI_STEPS: usize = 1_000_000;
pub const DEFAULT_SWEEP_STEPS: usize = 100_000;
pub const DEFAULT_SWEEP_THREADS: usize = 9;
pub const DEFAULT_MATRIX_SIZE: usize = 1000;
pub const DEFAULT_MATRIX_THREADS: usize = 4;
pub const DEFAULT_DAXPY_POW: u32 = 20;
pub const DEFAULT_SEED: u32 = 1;

/// Largest cell-wise relative error a parallel matrix result may show.
pub const MATRIX_TOLERANCE: f64 = 1e-9;

// Both built-in integrands stay within [0, 4] on [0, 1].
const INTEGRAND_BOUND: f64 = 4.0;

/// Thread counts a benchmark runs its variants at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadSweep {
    Fixed(ThreadBudget),
    /// Every count from 1 up to and including the budget.
    UpTo(ThreadBudget),
}

impl ThreadSweep {
    pub fn budgets(self) -> Vec<ThreadBudget> {
        match self {
            ThreadSweep::Fixed(t) => vec![t],
            ThreadSweep::UpTo(max) => (1..=max.get())
                .filter_map(|t| ThreadBudget::new(t).ok())
                .collect(),
        }
    }

    /// Largest count in the sweep.
    pub fn ceiling(self) -> ThreadBudget {
        match self {
            ThreadSweep::Fixed(t) | ThreadSweep::UpTo(t) => t,
        }
    }

    fn label(self, name: &str, threads: ThreadBudget) -> String {
        match self {
            ThreadSweep::Fixed(_) => name.to_string(),
            ThreadSweep::UpTo(_) => format!("{name} x{threads}"),
        }
    }
}

// Integration

#[derive(Clone, Debug)]
pub struct IntegrationBench {
    pub steps: usize,
    pub sweep: ThreadSweep,
    pub integrand: Integrand,
    pub strategies: Vec<Strategy>,
}

#[derive(Debug)]
pub struct IntegrationRun {
    pub record: TimingRecord,
    pub value: f64,
    /// `|value - baseline|`
    pub diff: f64,
    pub speedup: Speedup,
}

#[derive(Debug)]
pub struct IntegrationSummary {
    pub baseline: TimingRecord,
    pub baseline_value: f64,
    pub tolerance: f64,
    pub runs: Vec<IntegrationRun>,
    pub report: Report,
}

impl IntegrationBench {
    /// Atomic, critical and reduction over `sweep` on the default integrand.
    pub fn new(steps: usize, sweep: ThreadSweep) -> Self {
        IntegrationBench {
            steps,
            sweep,
            integrand: Integrand::default(),
            strategies: Strategy::PARALLEL.to_vec(),
        }
    }

    pub fn run(&self) -> Result<IntegrationSummary, BenchError> {
        let grid = Grid::unit(self.steps)?;
        let config = RuntimeConfigBuilder::default()
            .max_threads(self.sweep.ceiling().get())
            .build()?;
        let rt = Runtime::new(config)?;
        let f = |x: f64| self.integrand.eval(x);
        let eps = tolerance(&grid, INTEGRAND_BOUND);
        info!(
            steps = self.steps,
            threads = self.sweep.ceiling().get(),
            integrand = %self.integrand,
            "integration benchmark"
        );

        let mut report = Report::new();
        report.note(format!(
            "steps = {}, threads = {}, integrand = {}",
            self.steps,
            self.sweep.ceiling(),
            self.integrand
        ));

        let (baseline_value, elapsed) =
            timed(|| integrate(&rt, f, grid, ThreadBudget::ONE, Strategy::Sequential));
        let baseline_value = baseline_value?;
        let baseline = TimingRecord::new("integrate", Strategy::Sequential.name(), 1, elapsed);
        report.value("sequential pi", baseline_value);
        report.elapsed("sequential", elapsed);

        let mut runs = Vec::new();
        for threads in self.sweep.budgets() {
            for &strategy in &self.strategies {
                let label = self.sweep.label(strategy.name(), threads);
                let (value, elapsed) = timed(|| integrate(&rt, f, grid, threads, strategy));
                let value = match value {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(%label, error = %e, "integration failed");
                        report.failure(label, e);
                        continue;
                    }
                };
                let record = TimingRecord::new("integrate", strategy.name(), threads.get(), elapsed);
                let diff = (value - baseline_value).abs();
                let speedup = record.speedup_over(&baseline);
                report.value(format!("{label} pi"), value);
                report.elapsed(label.as_str(), elapsed);
                report.difference(label.as_str(), diff);
                report.speedup(label.as_str(), speedup);
                if diff > eps {
                    let e = BenchError::Validation {
                        label: label.clone(),
                        diff,
                        tolerance: eps,
                    };
                    warn!(error = %e, "integration out of tolerance");
                    report.failure(label, e);
                    continue;
                }
                runs.push(IntegrationRun {
                    record,
                    value,
                    diff,
                    speedup,
                });
            }
        }

        Ok(IntegrationSummary {
            baseline,
            baseline_value,
            tolerance: eps,
            runs,
            report,
        })
    }
}

// Matrix multiply granularity

/// How the two input matrices are filled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatrixInputs {
    Constant { a: f64, b: f64 },
    Random { seed: u32 },
}

impl Default for MatrixInputs {
    fn default() -> Self {
        MatrixInputs::Constant { a: 1.0, b: 2.0 }
    }
}

impl MatrixInputs {
    pub fn build(self, n: usize) -> Result<(Matrix, Matrix), KernelError> {
        match self {
            MatrixInputs::Constant { a, b } => Ok((Matrix::filled(n, a)?, Matrix::filled(n, b)?)),
            MatrixInputs::Random { seed } => Ok((
                Matrix::random(n, seed)?,
                Matrix::random(n, seed.wrapping_add(1))?,
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GranularityBench {
    pub size: usize,
    pub threads: ThreadBudget,
    pub granularities: Vec<Granularity>,
    pub inputs: MatrixInputs,
}

#[derive(Debug)]
pub struct VariantRun {
    pub granularity: Granularity,
    pub record: TimingRecord,
    pub max_relative_error: f64,
    pub speedup: Speedup,
    pub output: Matrix,
}

#[derive(Debug)]
pub struct GranularitySummary {
    pub baseline: TimingRecord,
    pub runs: Vec<VariantRun>,
    pub report: Report,
}

impl GranularityBench {
    pub fn new(size: usize, threads: ThreadBudget) -> Self {
        GranularityBench {
            size,
            threads,
            granularities: Granularity::ALL.to_vec(),
            inputs: MatrixInputs::default(),
        }
    }

    pub fn run(&self) -> Result<GranularitySummary, BenchError> {
        let (a, b) = self.inputs.build(self.size)?;
        let config = RuntimeConfigBuilder::default()
            .max_threads(self.threads.get())
            .max_active_levels(NESTED_LEVELS)
            .build()?;
        let controller = GranularityController::ready(config)?;
        info!(size = self.size, threads = self.threads.get(), "matrix multiply benchmark");

        let mut report = Report::new();
        report.note(format!("matrix size = {}, threads = {}", self.size, self.threads));

        let (expected, elapsed) = timed(|| mul_seq(&a, &b));
        let expected = expected?;
        let baseline = TimingRecord::new("mul", "sequential", 1, elapsed);
        report.elapsed("sequential multiplication", elapsed);

        let mut runs = Vec::new();
        for &granularity in &self.granularities {
            let label = format!("{granularity} parallelization");
            match self.variant(&controller, granularity, &a, &b, &expected, &baseline) {
                Ok(run) => {
                    let variant = run.record.variant();
                    report.elapsed(format!("{variant} parallelization"), run.record.elapsed());
                    report.value(format!("{variant} max relative error"), run.max_relative_error);
                    report.speedup(variant, run.speedup);
                    runs.push(run);
                }
                Err(e) => {
                    warn!(%label, error = %e, "variant failed");
                    report.failure(label, e);
                }
            }
        }

        Ok(GranularitySummary {
            baseline,
            runs,
            report,
        })
    }

    fn variant(
        &self,
        controller: &GranularityController,
        granularity: Granularity,
        a: &Matrix,
        b: &Matrix,
        expected: &Matrix,
        baseline: &TimingRecord,
    ) -> Result<VariantRun, BenchError> {
        let (output, elapsed) = timed(|| controller.run_variant(granularity, a, b));
        let output = output?;
        let max_relative_error = output.max_relative_diff(expected)?;
        if max_relative_error > MATRIX_TOLERANCE {
            return Err(BenchError::Validation {
                label: granularity.name().to_string(),
                diff: max_relative_error,
                tolerance: MATRIX_TOLERANCE,
            });
        }
        let record = TimingRecord::new("mul", granularity.name(), self.threads.get(), elapsed);
        Ok(VariantRun {
            granularity,
            speedup: record.speedup_over(baseline),
            record,
            max_relative_error,
            output,
        })
    }
}

// Sections

#[derive(Clone, Debug)]
pub struct SectionsBench {
    pub size: usize,
    pub threads: ThreadBudget,
    pub sections: usize,
    pub seed: u32,
}

#[derive(Debug)]
pub struct SectionsSummary {
    pub baselines: Vec<TimingRecord>,
    pub dispatch: DispatchReport,
    pub report: Report,
}

impl SectionsBench {
    pub fn new(size: usize, threads: ThreadBudget) -> Self {
        SectionsBench {
            size,
            threads,
            sections: DEFAULT_SECTIONS,
            seed: DEFAULT_SEED,
        }
    }

    pub fn run(&self) -> Result<SectionsSummary, BenchError> {
        let (a, b) = MatrixInputs::Random { seed: self.seed }.build(self.size)?;
        let dispatcher = SectionDispatcher::with_sections(self.threads, self.sections)?;
        info!(
            size = self.size,
            threads = self.threads.get(),
            inner = dispatcher.inner_threads().get(),
            "sections benchmark"
        );

        let mut report = Report::new();
        report.note(format!(
            "matrix size = {}, threads = {}, inner threads = {}",
            self.size,
            self.threads,
            dispatcher.inner_threads()
        ));

        let mut baselines = Vec::new();
        let mut expected = Vec::new();
        for op in MatrixOp::ALL {
            let (out, elapsed) = timed(|| op.sequential(&a, &b));
            expected.push(out?);
            baselines.push(TimingRecord::new(op.name(), "sequential", 1, elapsed));
            report.elapsed(format!("sequential {}", op.name()), elapsed);
        }

        let dispatch = dispatcher.dispatch(&a, &b);
        for outcome in &dispatch.sections {
            match &outcome.result {
                Ok(run) => report.elapsed(format!("{} parallel", run.record.kernel()), run.record.elapsed()),
                Err(e) => report.failure(format!("{} parallel", outcome.label), e),
            }
        }
        report.elapsed(
            format!("wall time (all {})", dispatch.sections.len()),
            dispatch.wall.elapsed(),
        );

        for ((outcome, baseline), want) in dispatch.sections.iter().zip(&baselines).zip(&expected) {
            let Ok(run) = &outcome.result else {
                continue;
            };
            report.speedup(outcome.label, run.record.speedup_over(baseline));
            match run.output.max_relative_diff(want) {
                Ok(diff) if diff <= MATRIX_TOLERANCE => {}
                Ok(diff) => {
                    let e = BenchError::Validation {
                        label: outcome.label.to_string(),
                        diff,
                        tolerance: MATRIX_TOLERANCE,
                    };
                    warn!(error = %e, "section out of tolerance");
                    report.failure(outcome.label, e);
                }
                Err(e) => report.failure(outcome.label, e),
            }
        }

        Ok(SectionsSummary {
            baselines,
            dispatch,
            report,
        })
    }
}

// DAXPY

#[derive(Clone, Debug)]
pub struct DaxpyBench {
    pub pow: u32,
    pub sweep: ThreadSweep,
    pub alpha: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug)]
pub struct DaxpySummary {
    pub len: usize,
    pub baseline: TimingRecord,
    pub runs: Vec<TimingRecord>,
    pub report: Report,
}

impl DaxpyBench {
    /// `x = 2.5 * x + y` with `x = 1` and `y = 2` on `2^pow` elements.
    pub fn new(pow: u32, sweep: ThreadSweep) -> Self {
        DaxpyBench {
            pow,
            sweep,
            alpha: 2.5,
            x: 1.0,
            y: 2.0,
        }
    }

    pub fn elements(&self) -> Result<usize, BenchError> {
        1usize.checked_shl(self.pow).ok_or_else(|| {
            BenchError::InvalidArgument(format!("2^{} elements do not fit in memory", self.pow))
        })
    }

    pub fn run(&self) -> Result<DaxpySummary, BenchError> {
        let len = self.elements()?;
        let y = vector(len, self.y)?;
        let config = RuntimeConfigBuilder::default()
            .max_threads(self.sweep.ceiling().get())
            .build()?;
        let rt = Runtime::new(config)?;
        let want = self.alpha * self.x + self.y;
        info!(len, threads = self.sweep.ceiling().get(), "daxpy benchmark");

        let mut report = Report::new();
        report.note(format!("size = 2^{} = {}, a = {}", self.pow, len, self.alpha));

        let mut x = vector(len, self.x)?;
        let (done, elapsed) = timed(|| daxpy_seq(self.alpha, &mut x, &y));
        done?;
        let baseline = TimingRecord::new("daxpy", "sequential", 1, elapsed);
        report.elapsed("sequential", elapsed);

        let mut runs = Vec::new();
        for threads in self.sweep.budgets() {
            let label = format!("daxpy x{threads}");
            match self.once(&rt, &y, threads, want) {
                Ok(record) => {
                    let label = format!("{} x{}", record.kernel(), record.threads());
                    report.elapsed(label.as_str(), record.elapsed());
                    report.speedup(label.as_str(), record.speedup_over(&baseline));
                    runs.push(record);
                }
                Err(e) => {
                    warn!(%label, error = %e, "daxpy run failed");
                    report.failure(label, e);
                }
            }
        }

        Ok(DaxpySummary {
            len,
            baseline,
            runs,
            report,
        })
    }

    fn once(
        &self,
        rt: &Runtime,
        y: &[f64],
        threads: ThreadBudget,
        want: f64,
    ) -> Result<TimingRecord, BenchError> {
        let mut x = vector(y.len(), self.x)?;
        let (done, elapsed) = timed(|| daxpy(rt, self.alpha, &mut x, y, threads));
        done?;
        if let Some(bad) = x.iter().find(|&&v| v != want) {
            return Err(BenchError::Validation {
                label: format!("daxpy x{threads}"),
                diff: (bad - want).abs(),
                tolerance: 0.0,
            });
        }
        Ok(TimingRecord::new("daxpy", "parallel", threads.get(), elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(n: usize) -> ThreadBudget {
        ThreadBudget::new(n).unwrap()
    }

    #[test]
    fn test_sweep_budgets() {
        let up: Vec<usize> = ThreadSweep::UpTo(budget(3))
            .budgets()
            .into_iter()
            .map(ThreadBudget::get)
            .collect();
        assert_eq!(up, vec![1, 2, 3]);
        assert_eq!(ThreadSweep::Fixed(budget(5)).budgets(), vec![budget(5)]);
        assert_eq!(ThreadSweep::UpTo(budget(9)).ceiling(), budget(9));
    }

    #[test]
    fn test_integration_report_has_every_strategy() {
        let summary = IntegrationBench::new(10_000, ThreadSweep::Fixed(budget(3)))
            .run()
            .unwrap();
        assert_eq!(summary.runs.len(), 3);
        assert_eq!(summary.report.failures(), 0);
        let text = summary.report.to_string();
        for s in Strategy::PARALLEL {
            assert!(text.contains(&format!("{s} diff: ")), "{text}");
            assert!(text.contains(&format!("{s} speedup: ")), "{text}");
        }
    }

    #[test]
    fn test_integration_rejects_zero_steps() {
        let err = IntegrationBench::new(0, ThreadSweep::Fixed(budget(2))).run();
        assert!(matches!(err, Err(BenchError::Kernel(KernelError::InvalidArgument(_)))));
    }

    #[test]
    fn test_granularity_bench_constant_inputs() {
        let summary = GranularityBench::new(4, budget(4)).run().unwrap();
        assert_eq!(summary.runs.len(), 3);
        for run in &summary.runs {
            assert!(run.output.as_slice().iter().all(|&v| v == 8.0));
            assert_eq!(run.max_relative_error, 0.0);
        }
        let text = summary.report.to_string();
        for g in Granularity::ALL {
            assert!(text.contains(&format!("{g} parallelization: ")), "{text}");
            assert!(text.contains(&format!("{g} speedup: ")), "{text}");
        }
    }

    #[test]
    fn test_sections_bench_validates() {
        let summary = SectionsBench::new(24, budget(4)).run().unwrap();
        assert_eq!(summary.report.failures(), 0);
        assert_eq!(summary.baselines.len(), 4);
        let text = summary.report.to_string();
        assert!(text.contains("sequential add: "));
        assert!(text.contains("transpose parallel: "));
        assert!(text.contains("wall time (all 4): "));
        assert!(text.contains("mul speedup: "));
    }

    #[test]
    fn test_daxpy_sweep() {
        let summary = DaxpyBench::new(10, ThreadSweep::UpTo(budget(4))).run().unwrap();
        assert_eq!(summary.len, 1024);
        assert_eq!(summary.runs.len(), 4);
        assert_eq!(summary.report.failures(), 0);
        let text = summary.report.to_string();
        for t in 1..=4 {
            assert!(text.contains(&format!("daxpy x{t}: ")), "{text}");
            assert!(text.contains(&format!("daxpy x{t} speedup: ")), "{text}");
        }
    }

    #[test]
    fn test_daxpy_rejects_oversized_power() {
        let bench = DaxpyBench::new(usize::BITS, ThreadSweep::Fixed(budget(1)));
        assert!(matches!(bench.run(), Err(BenchError::InvalidArgument(_))));
    }
}
