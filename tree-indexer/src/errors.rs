use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    /// Root-level I/O failure (the root is unreadable or not a directory).
    /// Per-file read failures are logged and skipped, never surfaced.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A background index build panicked or was cancelled.
    #[error("index task failed: {0}")]
    Task(String),

    /// Internal consistency violation (path partition, map mismatch).
    /// Fatal by contract; carries full context.
    #[error("index invariant violated: {0}")]
    Invariant(String),
}
