use thiserror::Error;

/// Error taxonomy shared by all engines.
///
/// `InvalidInput` is reported to the caller and never retried.
/// `Backend` covers embedding and persistence failures; callers abort
/// cleanly without partial writes. `NotFound` is reserved for lookups:
/// deleting an id that never existed is a successful no-op, not an error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(anyhow::anyhow!(msg.into()))
    }
}
