use persist_remote::RemoteIoError;

/// Errors that abort an import outright.
///
/// Faults below the root are not errors; they are collected in the
/// [`ImportManifest`](crate::ImportManifest).
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Remote(#[from] RemoteIoError),

    #[error("expected '{uri}' to name a single file, found {entries} entries")]
    NotASingleFile { uri: String, entries: usize },
}

/// Result alias for import operations.
pub type ImportResult<T> = Result<T, ImportError>;
