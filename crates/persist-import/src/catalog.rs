use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use persist_types::{Key, Value, CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Registration callback into the key-value store.
///
/// Registering a file makes it a lazily loadable object: only its path and
/// length are recorded, and its bytes are fetched chunk by chunk on demand.
pub trait ExternalRegistry: Send + Sync {
    /// Register the file at `path` and return its key.
    fn register_external_object(&self, path: &str, length: u64) -> Key;

    /// Register several files so they become visible together.
    ///
    /// The default registers them one at a time.
    fn register_external_objects(&self, files: &[(String, u64)]) -> Vec<Key> {
        files
            .iter()
            .map(|(path, length)| self.register_external_object(path, *length))
            .collect()
    }
}

/// A registered external file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    key: Key,
    path: String,
    length: u64,
}

impl FileObject {
    pub fn new(path: impl Into<String>, length: u64) -> Self {
        let path = path.into();
        Self {
            key: Key::plain(&path),
            path,
            length,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn chunk_count(&self) -> u32 {
        self.length.div_ceil(CHUNK_SIZE) as u32
    }

    /// Descriptor for chunk `index`, already marked persisted so that it is
    /// loaded from the remote file on first use.
    pub fn chunk(&self, index: u32) -> Option<Value> {
        let offset = u64::from(index) * CHUNK_SIZE;
        if offset >= self.length {
            return None;
        }
        let len = (self.length - offset).min(CHUNK_SIZE);
        Some(Value::persisted(Key::chunk(&self.path, index), len as usize))
    }
}

/// In-process object table.
#[derive(Default)]
pub struct ObjectCatalog {
    objects: RwLock<HashMap<Key, Arc<FileObject>>>,
}

impl ObjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Key) -> Option<Arc<FileObject>> {
        self.objects
            .read()
            .expect("catalog lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("catalog lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .objects
            .read()
            .expect("catalog lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl ExternalRegistry for ObjectCatalog {
    fn register_external_object(&self, path: &str, length: u64) -> Key {
        let object = FileObject::new(path, length);
        let key = object.key().clone();
        debug!(key = %key, length, "registered external object");
        self.objects
            .write()
            .expect("catalog lock poisoned")
            .insert(key.clone(), Arc::new(object));
        key
    }

    fn register_external_objects(&self, files: &[(String, u64)]) -> Vec<Key> {
        let objects: Vec<FileObject> = files
            .iter()
            .map(|(path, length)| FileObject::new(path.as_str(), *length))
            .collect();
        let keys: Vec<Key> = objects.iter().map(|o| o.key().clone()).collect();
        let mut table = self.objects.write().expect("catalog lock poisoned");
        for object in objects {
            table.insert(object.key().clone(), Arc::new(object));
        }
        debug!(count = keys.len(), "registered external objects");
        keys
    }
}

impl fmt::Debug for ObjectCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCatalog")
            .field("objects", &self.len())
            .finish()
    }
}
