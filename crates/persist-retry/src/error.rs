use std::time::Duration;

use persist_remote::RemoteError;

/// Errors surfaced by the retry executor.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// The operation raised a fault that retrying cannot fix.
    #[error("fatal remote I/O fault after {attempts} attempt(s): {source}")]
    Fatal {
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// The configured deadline passed while the fault was still transient.
    #[error("remote I/O still failing after {attempts} attempt(s) over {elapsed:?}: {source}")]
    Exhausted {
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: RemoteError,
    },
}

impl RetryError {
    /// The last fault raised by the operation.
    pub fn cause(&self) -> &RemoteError {
        match self {
            Self::Fatal { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Fatal { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Result alias for retried operations.
pub type RetryResult<T> = Result<T, RetryError>;
