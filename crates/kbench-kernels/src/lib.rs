//! Compute kernels for the kbench benchmarks.
//!
//! Every parallel kernel borrows its inputs, writes only a freshly allocated
//! output (or the one mutable buffer it is given), and takes its worker
//! budget from the caller. Sequential baselines sit next to each parallel
//! version so results can be checked against them.

pub mod accumulate;
pub mod daxpy;
mod error;
pub mod granularity;
pub mod integrate;
mod matrix;
pub mod ops;

pub use accumulate::Strategy;
pub use error::KernelError;
pub use granularity::{multiply, Granularity, LoopPlan};
pub use integrate::{integrate, integrate_unit, Grid, Integrand};
pub use matrix::Matrix;
pub use ops::MatrixOp;
