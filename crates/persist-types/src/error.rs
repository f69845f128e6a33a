use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("key encoding is empty")]
    EmptyKey,

    #[error("truncated chunk key: expected at least {expected} bytes, got {actual}")]
    TruncatedChunkKey { expected: usize, actual: usize },

    #[error("invalid persistence state tag: {0}")]
    InvalidState(u8),
}
