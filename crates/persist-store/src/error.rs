use persist_remote::RemoteIoError;
use persist_retry::RetryError;

/// Errors from the object store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Writes and deletes go only to the node's own durability root.
    #[error("adapter has no ice root; {0} is only valid on the ice store")]
    NotIceStore(&'static str),

    #[error("value {0} is already persisted")]
    AlreadyPersisted(String),

    #[error("value {0} is not persisted")]
    NotPersisted(String),

    #[error("value {0} is still marked persisted; clear it before deleting")]
    StillPersisted(String),

    /// Refused before any I/O: the buffer is not the whole object.
    #[error("refusing to store partial buffer for {key}: expected {expected} bytes, got {actual}")]
    PartialBuffer {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("remote I/O failed for '{path}': {source}")]
    Remote {
        path: String,
        #[source]
        source: RetryError,
    },

    /// A value held by reference has nothing at its key's address.
    #[error("no source object for {key} at {path}")]
    SourceMissing { key: String, path: String },

    #[error("failed to check source object: {0}")]
    Source(#[source] RemoteIoError),

    #[error("failed to create ice root: {0}")]
    IceRoot(#[from] RemoteIoError),
}

/// Result alias for adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;
