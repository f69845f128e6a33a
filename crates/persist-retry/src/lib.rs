//! Retrying I/O execution for remote-persist.
//!
//! Remote filesystems fail in ways a local block store never does: reads
//! stop short, sockets time out, and object stores surface consistency
//! glitches as client faults. [`RetryExecutor`] repeats a single operation
//! until it succeeds or raises a fault the [`Classifier`] deems fatal,
//! pausing a fixed delay between attempts and reporting every successful
//! transfer to an [`IoRecorder`].

pub mod classify;
pub mod error;
pub mod executor;
pub mod telemetry;

pub use classify::{classify, Classification, Classifier, Matcher, Rule, S3_EXCEPTION_MARKER};
pub use error::{RetryError, RetryResult};
pub use executor::{RetryExecutor, RetryPolicy, DEFAULT_RETRY_DELAY};
pub use telemetry::{IoDirection, IoEvent, IoRecorder, NullRecorder, Timeline, MEDIUM_REMOTE};
