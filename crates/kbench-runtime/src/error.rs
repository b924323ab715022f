use thiserror::Error;

/// Failures raised by the worker-team runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A size, count or budget was rejected before any region started.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The worker team could not be created.
    #[error("failed to build worker team: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    /// A worker panicked inside a region. Raised on the calling thread after
    /// the region's barrier.
    #[error("worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
}

impl RuntimeError {
    pub(crate) fn from_panic(worker: usize, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        RuntimeError::WorkerPanicked { worker, message }
    }
}
