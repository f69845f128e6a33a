use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Direction of an I/O event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoDirection {
    Read,
    Write,
}

impl fmt::Display for IoDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Medium tag for the remote filesystem.
pub const MEDIUM_REMOTE: &str = "remote";

/// One completed I/O operation.
#[derive(Clone, Debug)]
pub struct IoEvent {
    /// Start of the final, successful attempt.
    pub start: Instant,
    /// Wall-clock time (ms since epoch) before the first attempt.
    pub wall_start_ms: u64,
    /// Blocking time of the final attempt only.
    pub duration: Duration,
    pub direction: IoDirection,
    pub bytes: u64,
    pub medium: &'static str,
}

/// Process-wide telemetry sink.
pub trait IoRecorder: Send + Sync {
    fn record_io(&self, event: IoEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecorder;

impl IoRecorder for NullRecorder {
    fn record_io(&self, _event: IoEvent) {}
}

/// Bounded in-memory ring of recent I/O events.
pub struct Timeline {
    events: Mutex<VecDeque<IoEvent>>,
    capacity: usize,
}

impl Timeline {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("timeline lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the retained events, oldest first.
    pub fn snapshot(&self) -> Vec<IoEvent> {
        self.events
            .lock()
            .expect("timeline lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Event count and byte total for one direction.
    pub fn totals(&self, direction: IoDirection) -> (usize, u64) {
        self.events
            .lock()
            .expect("timeline lock poisoned")
            .iter()
            .filter(|e| e.direction == direction)
            .fold((0, 0), |(n, bytes), e| (n + 1, bytes + e.bytes))
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(2048)
    }
}

impl IoRecorder for Timeline {
    fn record_io(&self, event: IoEvent) {
        trace!(
            direction = %event.direction,
            bytes = event.bytes,
            duration_us = event.duration.as_micros() as u64,
            medium = event.medium,
            "io recorded"
        );
        let mut events = self.events.lock().expect("timeline lock poisoned");
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

pub(crate) fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(direction: IoDirection, bytes: u64) -> IoEvent {
        IoEvent {
            start: Instant::now(),
            wall_start_ms: wall_clock_ms(),
            duration: Duration::from_millis(1),
            direction,
            bytes,
            medium: MEDIUM_REMOTE,
        }
    }

    #[test]
    fn timeline_keeps_most_recent() {
        let t = Timeline::new(2);
        t.record_io(event(IoDirection::Read, 1));
        t.record_io(event(IoDirection::Read, 2));
        t.record_io(event(IoDirection::Write, 3));
        let kept: Vec<u64> = t.snapshot().iter().map(|e| e.bytes).collect();
        assert_eq!(kept, vec![2, 3]);
    }

    #[test]
    fn totals_by_direction() {
        let t = Timeline::default();
        t.record_io(event(IoDirection::Read, 10));
        t.record_io(event(IoDirection::Read, 5));
        t.record_io(event(IoDirection::Write, 0));
        assert_eq!(t.totals(IoDirection::Read), (2, 15));
        assert_eq!(t.totals(IoDirection::Write), (1, 0));
    }
}
