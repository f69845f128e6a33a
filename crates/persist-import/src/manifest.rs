use persist_types::Key;
use serde::{Deserialize, Serialize};

/// Outcome of one import: what was registered and what could not be read.
///
/// Failures are human-readable and name the path they concern.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportManifest {
    pub keys: Vec<Key>,
    pub failures: Vec<String>,
}

impl ImportManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manifest holding a single failure.
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            keys: Vec::new(),
            failures: vec![description.into()],
        }
    }

    /// Append `other`'s keys and failures after this manifest's own.
    pub fn merge(&mut self, other: ImportManifest) {
        self.keys.extend(other.keys);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
