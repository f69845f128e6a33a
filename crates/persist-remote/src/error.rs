use std::io;
use std::path::PathBuf;

/// Broad shape of a client fault, independent of its reported type name.
///
/// Client libraries model the same logical condition in different ways:
/// an object-store consistency glitch may surface as a checked I/O fault in
/// one version and as an unchecked runtime fault in another. Retry
/// classification looks at the category and the type name together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultCategory {
    EndOfStream,
    SocketTimeout,
    /// Any other I/O fault (including not-found).
    Io,
    /// Unchecked fault raised outside the I/O hierarchy.
    Runtime,
    /// Anything else.
    Other,
}

/// A fault raised by a remote filesystem client.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("end of stream: {0}")]
    EndOfStream(String),

    #[error("socket timeout: {0}")]
    SocketTimeout(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("{type_name}: {message}")]
    Io { type_name: String, message: String },

    #[error("{type_name}: {message}")]
    Runtime { type_name: String, message: String },

    #[error("{type_name}: {message}")]
    Other { type_name: String, message: String },
}

impl RemoteError {
    pub fn io(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn runtime(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Runtime {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn other(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> FaultCategory {
        match self {
            Self::EndOfStream(_) => FaultCategory::EndOfStream,
            Self::SocketTimeout(_) => FaultCategory::SocketTimeout,
            Self::NotFound(_) | Self::Io { .. } => FaultCategory::Io,
            Self::Runtime { .. } => FaultCategory::Runtime,
            Self::Other { .. } => FaultCategory::Other,
        }
    }

    /// The type name the client reported for this fault.
    pub fn type_name(&self) -> &str {
        match self {
            Self::EndOfStream(_) => "EOFException",
            Self::SocketTimeout(_) => "SocketTimeoutException",
            Self::NotFound(_) => "FileNotFoundException",
            Self::Io { type_name, .. }
            | Self::Runtime { type_name, .. }
            | Self::Other { type_name, .. } => type_name,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// I/O kinds that no amount of waiting will fix. They surface outside the
/// I/O category so retry classification treats them as fatal.
const PERMANENT_IO_KINDS: &[&str] = &["InvalidFilename"];

impl From<io::Error> for RemoteError {
    fn from(err: io::Error) -> Self {
        let kind = err.kind();
        let mut message = err.to_string();
        if let Some(inner) = err.into_inner() {
            match inner.downcast::<RemoteError>() {
                Ok(remote) => return *remote,
                Err(other) => message = other.to_string(),
            }
        }
        match kind {
            io::ErrorKind::UnexpectedEof => Self::EndOfStream(message),
            // Unix reports an expired socket read timeout as WouldBlock.
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::SocketTimeout(message),
            io::ErrorKind::NotFound => Self::NotFound(message),
            other => {
                let name = format!("{other:?}");
                if PERMANENT_IO_KINDS.contains(&name.as_str()) {
                    Self::other(name, message)
                } else {
                    Self::io(name, message)
                }
            }
        }
    }
}

impl From<RemoteError> for io::Error {
    fn from(err: RemoteError) -> Self {
        let kind = match &err {
            RemoteError::EndOfStream(_) => io::ErrorKind::UnexpectedEof,
            RemoteError::SocketTimeout(_) => io::ErrorKind::TimedOut,
            RemoteError::NotFound(_) => io::ErrorKind::NotFound,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Result alias for client calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// The single externally visible error shape of remote-persist: the path
/// being accessed, the active configuration, and the underlying fault.
#[derive(Debug, thiserror::Error)]
#[error("remote I/O failed for '{path}' ({config}): {source}")]
pub struct RemoteIoError {
    pub path: String,
    pub config: String,
    #[source]
    pub source: RemoteError,
}

impl RemoteIoError {
    pub fn new(path: impl Into<String>, config: impl ToString, source: RemoteError) -> Self {
        Self {
            path: path.into(),
            config: config.to_string(),
            source,
        }
    }
}

/// Errors loading the shared remote configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to open remote configuration file {0}")]
    Missing(PathBuf),

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid remote configuration in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds_map_to_categories() {
        let eof: RemoteError = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert_eq!(eof.category(), FaultCategory::EndOfStream);

        let timeout: RemoteError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert_eq!(timeout.category(), FaultCategory::SocketTimeout);

        let would_block: RemoteError = io::Error::new(io::ErrorKind::WouldBlock, "read timed out").into();
        assert_eq!(would_block.category(), FaultCategory::SocketTimeout);

        let missing: RemoteError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(missing.is_not_found());
        assert_eq!(missing.category(), FaultCategory::Io);

        let denied: RemoteError = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert_eq!(denied.type_name(), "PermissionDenied");
        assert_eq!(denied.category(), FaultCategory::Io);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn name_too_long_is_not_an_io_fault() {
        // ENAMETOOLONG
        let err: RemoteError = io::Error::from_raw_os_error(36).into();
        assert_eq!(err.type_name(), "InvalidFilename");
        assert_eq!(err.category(), FaultCategory::Other);
    }

    #[test]
    fn boxed_remote_error_survives_io_roundtrip() {
        let original = RemoteError::runtime("org.jets3t.S3ServiceException", "503");
        let wrapped: io::Error = original.clone().into();
        let back: RemoteError = wrapped.into();
        assert_eq!(back, original);
    }

    #[test]
    fn diagnostic_error_carries_context() {
        let err = RemoteIoError::new("hdfs://nn/x", "Configuration: core", RemoteError::NotFound("x".into()));
        let msg = err.to_string();
        assert!(msg.contains("hdfs://nn/x"));
        assert!(msg.contains("Configuration: core"));
        assert!(msg.contains("file not found"));
    }
}
