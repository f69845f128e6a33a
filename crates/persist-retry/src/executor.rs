use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use persist_remote::RemoteResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::classify::{Classification, Classifier, S3_EXCEPTION_MARKER};
use crate::error::{RetryError, RetryResult};
use crate::telemetry::{wall_clock_ms, IoDirection, IoEvent, IoRecorder, NullRecorder, MEDIUM_REMOTE};

/// Delay between attempts when none is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Tunables for [`RetryExecutor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Fixed pause between attempts. There is no backoff.
    pub delay: Duration,
    /// Type-name substrings that mark I/O and runtime faults as transient.
    pub transient_markers: Vec<String>,
    /// Give up once this much time has passed since the first attempt.
    /// `None` retries transient faults forever.
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            transient_markers: vec![S3_EXCEPTION_MARKER.to_string()],
            max_elapsed: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }
}

/// Runs one remote operation to completion, retrying transient faults.
///
/// Each call to [`execute`](Self::execute) is independent and blocks the
/// calling thread, sleeping between attempts. Successful calls are reported
/// to the [`IoRecorder`] with the duration of the final attempt.
pub struct RetryExecutor {
    policy: RetryPolicy,
    classifier: Classifier,
    recorder: Arc<dyn IoRecorder>,
    medium: &'static str,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, recorder: Arc<dyn IoRecorder>) -> Self {
        let classifier = Classifier::with_transient_markers(&policy.transient_markers[..]);
        Self {
            policy,
            classifier,
            recorder,
            medium: MEDIUM_REMOTE,
        }
    }

    /// Override the medium tag attached to recorded events.
    pub fn with_medium(mut self, medium: &'static str) -> Self {
        self.medium = medium;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Call `op` until it succeeds or fails fatally.
    ///
    /// `direction` and `bytes` describe the transfer for telemetry only.
    pub fn execute<T, F>(&self, mut op: F, direction: IoDirection, bytes: u64) -> RetryResult<T>
    where
        F: FnMut() -> RemoteResult<T>,
    {
        let wall_start_ms = wall_clock_ms();
        let first_attempt = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let start = Instant::now();
            let fault = match op() {
                Ok(value) => {
                    self.recorder.record_io(IoEvent {
                        start,
                        wall_start_ms,
                        duration: start.elapsed(),
                        direction,
                        bytes,
                        medium: self.medium,
                    });
                    if attempts > 1 {
                        debug!(attempts, %direction, bytes, "remote I/O succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(fault) => fault,
            };

            match self.classifier.classify(&fault) {
                Classification::TransientSilent => {
                    debug!(attempt = attempts, %direction, error = %fault, "transient remote fault, retrying");
                }
                Classification::TransientLogged => {
                    warn!(
                        attempt = attempts,
                        %direction,
                        fault_type = fault.type_name(),
                        error = ?fault,
                        "remote I/O fault, retrying"
                    );
                }
                Classification::Fatal => {
                    error!(attempt = attempts, %direction, error = %fault, "fatal remote I/O fault");
                    return Err(RetryError::Fatal {
                        attempts,
                        source: fault,
                    });
                }
            }

            let elapsed = first_attempt.elapsed();
            if let Some(limit) = self.policy.max_elapsed {
                if elapsed + self.policy.delay > limit {
                    error!(attempts, elapsed_ms = elapsed.as_millis() as u64, "remote I/O retry deadline passed");
                    return Err(RetryError::Exhausted {
                        attempts,
                        elapsed,
                        source: fault,
                    });
                }
            }
            thread::sleep(self.policy.delay);
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), Arc::new(NullRecorder))
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("medium", &self.medium)
            .finish()
    }
}
