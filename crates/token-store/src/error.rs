//! Error types for token storage

/// Errors from token storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown token storage backend {selector:?} (available: {available})")]
    UnknownBackend { selector: String, available: String },

    #[error("token storage I/O error: {0}")]
    Io(String),

    #[error("token storage parse error: {0}")]
    Parse(String),
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;
