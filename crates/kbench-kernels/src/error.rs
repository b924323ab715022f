use runtime::RuntimeError;
use thiserror::Error;

/// Failures a kernel call can report. All of them are raised before the
/// kernel's region starts, except worker panics surfaced by the runtime.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("could not allocate {elements} matrix elements")]
    AllocationFailure { elements: usize },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
