//! Element-wise and product kernels, one output row at a time.
//!
//! Every kernel is written as a row function `(a, b, i, out)` that fills
//! output row `i`. The sequential baselines call it for each row in turn; the
//! parallel versions hand disjoint row blocks of the output to workers, so no
//! two workers ever write the same cell.

use runtime::{Runtime, ThreadBudget};
use tracing::debug;

use crate::error::KernelError;
use crate::granularity::{self, LoopPlan};
use crate::matrix::{ensure_same_dim, Matrix};

type RowKernel = fn(&Matrix, &Matrix, usize, &mut [f64]);

/// The four matrix operations run by the benchmarks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatrixOp {
    Add,
    Sub,
    Mul,
    Transpose,
}

impl MatrixOp {
    pub const ALL: [MatrixOp; 4] = [MatrixOp::Add, MatrixOp::Sub, MatrixOp::Mul, MatrixOp::Transpose];

    pub fn name(self) -> &'static str {
        match self {
            MatrixOp::Add => "add",
            MatrixOp::Sub => "sub",
            MatrixOp::Mul => "mul",
            MatrixOp::Transpose => "transpose",
        }
    }

    /// Single-threaded baseline. `b` is ignored by `Transpose`.
    pub fn sequential(self, a: &Matrix, b: &Matrix) -> Result<Matrix, KernelError> {
        match self {
            MatrixOp::Add => add_seq(a, b),
            MatrixOp::Sub => sub_seq(a, b),
            MatrixOp::Mul => mul_seq(a, b),
            MatrixOp::Transpose => transpose_seq(a),
        }
    }

    /// Row-parallel version with `budget` workers. `b` is ignored by
    /// `Transpose`.
    pub fn parallel(
        self,
        rt: &Runtime,
        a: &Matrix,
        b: &Matrix,
        budget: ThreadBudget,
    ) -> Result<Matrix, KernelError> {
        match self {
            MatrixOp::Add => add(rt, a, b, budget),
            MatrixOp::Sub => sub(rt, a, b, budget),
            MatrixOp::Mul => granularity::multiply(rt, a, b, LoopPlan::Outer(budget)),
            MatrixOp::Transpose => transpose(rt, a, budget),
        }
    }
}

pub(crate) fn add_row(a: &Matrix, b: &Matrix, i: usize, out: &mut [f64]) {
    for ((c, x), y) in out.iter_mut().zip(a.row(i)).zip(b.row(i)) {
        *c = x + y;
    }
}

pub(crate) fn sub_row(a: &Matrix, b: &Matrix, i: usize, out: &mut [f64]) {
    for ((c, x), y) in out.iter_mut().zip(a.row(i)).zip(b.row(i)) {
        *c = x - y;
    }
}

/// Output row `i` of the transpose is column `i` of `a`.
pub(crate) fn transpose_row(a: &Matrix, _b: &Matrix, i: usize, out: &mut [f64]) {
    let n = a.dim();
    let src = a.as_slice();
    for (j, c) in out.iter_mut().enumerate() {
        *c = src[j * n + i];
    }
}

/// Cell (i, j) of `a * b`. The k-loop always runs in one worker, in index
/// order, so every variant reproduces the sequential sum bit for bit.
#[inline]
pub(crate) fn mul_cell(a: &Matrix, b: &Matrix, i: usize, j: usize) -> f64 {
    let n = a.dim();
    let (lhs, rhs) = (a.as_slice(), b.as_slice());
    let mut sum = 0.0;
    for k in 0..n {
        sum += lhs[i * n + k] * rhs[k * n + j];
    }
    sum
}

pub(crate) fn mul_row(a: &Matrix, b: &Matrix, i: usize, out: &mut [f64]) {
    for (j, c) in out.iter_mut().enumerate() {
        *c = mul_cell(a, b, i, j);
    }
}

fn run_seq(a: &Matrix, b: &Matrix, kernel: RowKernel) -> Result<Matrix, KernelError> {
    let n = a.dim();
    let mut c = Matrix::zeros(n)?;
    if n == 0 {
        return Ok(c);
    }
    for (i, out) in c.as_mut_slice().chunks_mut(n).enumerate() {
        kernel(a, b, i, out);
    }
    Ok(c)
}

pub(crate) fn run_rows(
    rt: &Runtime,
    a: &Matrix,
    b: &Matrix,
    budget: ThreadBudget,
    kernel: RowKernel,
) -> Result<Matrix, KernelError> {
    let n = a.dim();
    let mut c = Matrix::zeros(n)?;
    if n == 0 {
        return Ok(c);
    }
    rt.map_chunks_mut(c.as_mut_slice(), n, budget, |rows, block| {
        for (i, out) in rows.zip(block.chunks_mut(n)) {
            kernel(a, b, i, out);
        }
    })?;
    Ok(c)
}

pub fn add_seq(a: &Matrix, b: &Matrix) -> Result<Matrix, KernelError> {
    ensure_same_dim(a, b)?;
    run_seq(a, b, add_row)
}

pub fn sub_seq(a: &Matrix, b: &Matrix) -> Result<Matrix, KernelError> {
    ensure_same_dim(a, b)?;
    run_seq(a, b, sub_row)
}

/// Plain triple loop; the reference every multiply variant is checked against.
pub fn mul_seq(a: &Matrix, b: &Matrix) -> Result<Matrix, KernelError> {
    ensure_same_dim(a, b)?;
    run_seq(a, b, mul_row)
}

pub fn transpose_seq(a: &Matrix) -> Result<Matrix, KernelError> {
    run_seq(a, a, transpose_row)
}

pub fn add(rt: &Runtime, a: &Matrix, b: &Matrix, budget: ThreadBudget) -> Result<Matrix, KernelError> {
    ensure_same_dim(a, b)?;
    debug!(n = a.dim(), workers = budget.get(), "add");
    run_rows(rt, a, b, budget, add_row)
}

pub fn sub(rt: &Runtime, a: &Matrix, b: &Matrix, budget: ThreadBudget) -> Result<Matrix, KernelError> {
    ensure_same_dim(a, b)?;
    debug!(n = a.dim(), workers = budget.get(), "sub");
    run_rows(rt, a, b, budget, sub_row)
}

pub fn transpose(rt: &Runtime, a: &Matrix, budget: ThreadBudget) -> Result<Matrix, KernelError> {
    debug!(n = a.dim(), workers = budget.get(), "transpose");
    run_rows(rt, a, a, budget, transpose_row)
}
