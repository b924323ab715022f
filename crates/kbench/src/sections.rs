//! Runs independent matrix kernels as concurrent sections, each with its own
//! inner parallel region.

use kernels::{KernelError, Matrix, MatrixOp};
use runtime::{Runtime, RuntimeConfigBuilder, Task, ThreadBudget};
use tracing::{info, warn};

use crate::controller::NESTED_LEVELS;
use crate::error::BenchError;
use crate::timing::{timed, TimingRecord};

pub const DEFAULT_SECTIONS: usize = 4;

/// Body of one section: gets the shared team and its inner worker budget.
pub type SectionBody<'a> =
    Box<dyn FnOnce(&Runtime, ThreadBudget) -> Result<Matrix, KernelError> + Send + 'a>;

pub struct Section<'a> {
    label: &'static str,
    body: SectionBody<'a>,
}

impl<'a> Section<'a> {
    pub fn new<F>(label: &'static str, body: F) -> Self
    where
        F: FnOnce(&Runtime, ThreadBudget) -> Result<Matrix, KernelError> + Send + 'a,
    {
        Section {
            label,
            body: Box::new(body),
        }
    }

    /// Section running `op` row-parallel on `a` and `b`.
    pub fn op(op: MatrixOp, a: &'a Matrix, b: &'a Matrix) -> Self {
        Section::new(op.name(), move |rt, inner| op.parallel(rt, a, b, inner))
    }
}

#[derive(Debug)]
pub struct SectionRun {
    pub record: TimingRecord,
    pub output: Matrix,
}

#[derive(Debug)]
pub struct SectionOutcome {
    pub label: &'static str,
    pub result: Result<SectionRun, BenchError>,
}

/// Everything one dispatch produced.
#[derive(Debug)]
pub struct DispatchReport {
    pub sections: Vec<SectionOutcome>,
    /// Wall-clock time of the whole dispatch.
    pub wall: TimingRecord,
    pub inner: ThreadBudget,
}

impl DispatchReport {
    pub fn get(&self, label: &str) -> Option<&SectionOutcome> {
        self.sections.iter().find(|s| s.label == label)
    }

    pub fn failures(&self) -> usize {
        self.sections.iter().filter(|s| s.result.is_err()).count()
    }
}

/// Splits a total thread budget between `sections` concurrent tasks and
/// their inner regions: every task gets `max(1, total / sections)` workers.
pub struct SectionDispatcher {
    runtime: Runtime,
    sections: usize,
}

impl SectionDispatcher {
    pub fn new(total: ThreadBudget) -> Result<Self, BenchError> {
        Self::with_sections(total, DEFAULT_SECTIONS)
    }

    pub fn with_sections(total: ThreadBudget, sections: usize) -> Result<Self, BenchError> {
        if sections == 0 {
            return Err(BenchError::InvalidArgument(
                "section count must be at least 1".into(),
            ));
        }
        let config = RuntimeConfigBuilder::default()
            .max_threads(total.get())
            .max_active_levels(NESTED_LEVELS)
            .build()?;
        let runtime = Runtime::new(config)?;
        Ok(SectionDispatcher { runtime, sections })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn total(&self) -> ThreadBudget {
        self.runtime.ceiling()
    }

    pub fn sections(&self) -> usize {
        self.sections
    }

    pub fn inner_threads(&self) -> ThreadBudget {
        self.total().split(self.sections)
    }

    /// Runs add, sub, mul and transpose of `a` and `b` concurrently.
    pub fn dispatch(&self, a: &Matrix, b: &Matrix) -> DispatchReport {
        let sections = MatrixOp::ALL
            .into_iter()
            .map(|op| Section::op(op, a, b))
            .collect();
        self.dispatch_sections(sections)
    }

    /// Runs arbitrary sections concurrently. A failing section is reported in
    /// its own slot and does not stop the others.
    pub fn dispatch_sections(&self, sections: Vec<Section<'_>>) -> DispatchReport {
        let inner = self.inner_threads();
        let rt = &self.runtime;
        let labels: Vec<&'static str> = sections.iter().map(|s| s.label).collect();
        info!(
            sections = labels.len(),
            total = self.total().get(),
            inner = inner.get(),
            "dispatching sections"
        );

        let tasks: Vec<_> = sections
            .into_iter()
            .map(|section| {
                let task: Task<'_, Result<SectionRun, BenchError>> = Box::new(move || {
                    let Section { label, body } = section;
                    let (output, elapsed) = timed(|| body(rt, inner));
                    Ok(SectionRun {
                        record: TimingRecord::new(label, "sections", inner.get(), elapsed),
                        output: output?,
                    })
                });
                task
            })
            .collect();

        let (outcomes, wall) = timed(|| rt.run_tasks(tasks));

        let sections = labels
            .into_iter()
            .zip(outcomes)
            .map(|(label, outcome)| {
                let result = outcome.map_err(BenchError::from).and_then(|run| run);
                if let Err(e) = &result {
                    warn!(section = label, error = %e, "section failed");
                }
                SectionOutcome { label, result }
            })
            .collect();

        DispatchReport {
            sections,
            wall: TimingRecord::new("all", "sections", self.total().get(), wall),
            inner,
        }
    }
}
