use kernels::KernelError;
use runtime::{RuntimeConfigBuilderError, RuntimeError};
use thiserror::Error;

use crate::controller::ControllerState;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("controller is {state}, expected {expected}")]
    InvalidState {
        state: ControllerState,
        expected: ControllerState,
    },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("invalid runtime configuration: {0}")]
    Config(#[from] RuntimeConfigBuilderError),

    #[error("{label} differs from the sequential baseline by {diff:e} (tolerance {tolerance:e})")]
    Validation {
        label: String,
        diff: f64,
        tolerance: f64,
    },
}
