use thiserror::Error;

/// Errors surfaced by jobs, the worker, and the optimizer.
///
/// Problems local to one search chain (a shape that mutates off canvas, a
/// zero-area candidate) are never errors: they just score badly.
#[derive(Debug, Error)]
pub enum JobError {
    /// Zero-sized bitmap, a pixel buffer of the wrong length, or target and
    /// current bitmaps of different sizes.
    #[error("invalid bitmap dimensions: {0}")]
    InvalidDimensions(String),

    /// The shape type mask is empty. Recoverable: enable a type and retry.
    #[error("no shape types are enabled")]
    NoEnabledShapeTypes,

    /// A second step was requested while one is still outstanding.
    #[error("a step is already in flight for this job")]
    StepAlreadyInFlight,

    #[error("invalid run options: {0}")]
    InvalidOptions(String),

    #[error("job worker thread has shut down")]
    WorkerDisconnected,

    #[error("no job named {0:?}")]
    UnknownJob(String),

    #[error("failed to build search thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, JobError>;
