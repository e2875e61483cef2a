use thiserror::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tool process could not be spawned: {0}")]
    Spawn(String),

    #[error("tool run exceeded its deadline")]
    Timeout,

    #[error("tool output parse error: {0}")]
    Parse(String),

    #[error("tool output was not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
