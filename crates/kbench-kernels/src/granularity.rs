//! Matrix multiply distributed at different loop levels.

use core::fmt;

use runtime::{NestedBudget, Runtime, RuntimeError, ThreadBudget};
use tracing::debug;

use crate::error::KernelError;
use crate::matrix::{ensure_same_dim, Matrix};
use crate::ops::{mul_cell, mul_row, run_rows};

/// Which loop level(s) of the multiply are shared among workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Row loop distributed; each worker owns a block of full rows.
    Outer,
    /// Row loop sequential; the column loop of every row is its own region.
    Inner,
    /// Row loop distributed, and inside each row the column loop again.
    Nested,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Outer, Granularity::Inner, Granularity::Nested];

    pub fn name(self) -> &'static str {
        match self {
            Granularity::Outer => "outer-loop",
            Granularity::Inner => "inner-loop",
            Granularity::Nested => "nested",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A granularity together with the worker budget of each of its levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopPlan {
    Outer(ThreadBudget),
    Inner(ThreadBudget),
    Nested(NestedBudget),
}

impl LoopPlan {
    pub fn granularity(&self) -> Granularity {
        match self {
            LoopPlan::Outer(_) => Granularity::Outer,
            LoopPlan::Inner(_) => Granularity::Inner,
            LoopPlan::Nested(_) => Granularity::Nested,
        }
    }

    /// Workers the plan keeps busy at once when every level gets its budget.
    pub fn workers(&self) -> usize {
        match self {
            LoopPlan::Outer(b) | LoopPlan::Inner(b) => b.get(),
            LoopPlan::Nested(nb) => nb.total(),
        }
    }
}

/// `C = A * B` executed according to `plan`.
pub fn multiply(rt: &Runtime, a: &Matrix, b: &Matrix, plan: LoopPlan) -> Result<Matrix, KernelError> {
    ensure_same_dim(a, b)?;
    let n = a.dim();
    debug!(n, granularity = %plan.granularity(), workers = plan.workers(), "multiply");

    match plan {
        LoopPlan::Outer(budget) => run_rows(rt, a, b, budget, mul_row),
        LoopPlan::Inner(budget) => {
            let mut c = Matrix::zeros(n)?;
            if n == 0 {
                return Ok(c);
            }
            for (i, row) in c.as_mut_slice().chunks_mut(n).enumerate() {
                columns(rt, a, b, i, row, budget)?;
            }
            Ok(c)
        }
        LoopPlan::Nested(nb) => {
            let mut c = Matrix::zeros(n)?;
            if n == 0 {
                return Ok(c);
            }
            let outcomes = rt.map_chunks_mut(c.as_mut_slice(), n, nb.outer, |rows, block| {
                rows.zip(block.chunks_mut(n))
                    .try_for_each(|(i, row)| columns(rt, a, b, i, row, nb.inner))
            })?;
            outcomes.into_iter().collect::<Result<(), RuntimeError>>()?;
            Ok(c)
        }
    }
}

/// Fills row `i` with its column loop shared among `budget` workers.
fn columns(
    rt: &Runtime,
    a: &Matrix,
    b: &Matrix,
    i: usize,
    row: &mut [f64],
    budget: ThreadBudget,
) -> Result<(), RuntimeError> {
    rt.map_chunks_mut(row, 1, budget, |cols, cells| {
        for (j, cell) in cols.zip(cells) {
            *cell = mul_cell(a, b, i, j);
        }
    })?;
    Ok(())
}
