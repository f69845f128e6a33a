use persist_remote::FileStatus;
use serde::{Deserialize, Serialize};

/// One directory listing entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistEntry {
    /// Final path segment.
    pub name: String,
    /// Length in bytes; 0 for directories.
    pub size: u64,
    pub timestamp_millis: u64,
}

impl From<&FileStatus> for PersistEntry {
    fn from(status: &FileStatus) -> Self {
        Self {
            name: status.path.name().to_string(),
            size: status.length,
            timestamp_millis: status.modification_time,
        }
    }
}
