use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::RwLock;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::key::Key;

/// Persistence state of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PersistState {
    /// Only in memory.
    NotPersisted = 0,
    /// A store is in flight.
    Persisting = 1,
    /// Durable on the backing store.
    Persisted = 2,
}

impl TryFrom<u8> for PersistState {
    type Error = TypeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::NotPersisted),
            1 => Ok(Self::Persisting),
            2 => Ok(Self::Persisted),
            other => Err(TypeError::InvalidState(other)),
        }
    }
}

impl fmt::Display for PersistState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPersisted => write!(f, "not-persisted"),
            Self::Persisting => write!(f, "persisting"),
            Self::Persisted => write!(f, "persisted"),
        }
    }
}

/// Descriptor of one stored object.
///
/// Owned by the durability layer and shared across threads; the persistence
/// flag is atomic and the buffer is an immutable [`Bytes`] handle, so a
/// `&Value` is enough to flip the flag or attach data.
pub struct Value {
    key: Key,
    max: usize,
    state: AtomicU8,
    mem: RwLock<Option<Bytes>>,
}

impl Value {
    /// A not-yet-persisted value holding `data` in memory.
    pub fn new(key: Key, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            key,
            max: data.len(),
            state: AtomicU8::new(PersistState::NotPersisted as u8),
            mem: RwLock::new(Some(data)),
        }
    }

    /// A value that already lives on the backing store and has no buffer.
    pub fn persisted(key: Key, max: usize) -> Self {
        Self {
            key,
            max,
            state: AtomicU8::new(PersistState::Persisted as u8),
            mem: RwLock::new(None),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Declared size in bytes.
    pub fn max(&self) -> usize {
        self.max
    }

    pub fn state(&self) -> PersistState {
        // Only this type writes the tag, and only valid discriminants.
        PersistState::try_from(self.state.load(Ordering::Acquire))
            .unwrap_or(PersistState::NotPersisted)
    }

    pub fn is_persisted(&self) -> bool {
        self.state() == PersistState::Persisted
    }

    /// Mark a store as in flight. Returns `false` if the value was not in
    /// the not-persisted state.
    pub fn begin_persist(&self) -> bool {
        self.state
            .compare_exchange(
                PersistState::NotPersisted as u8,
                PersistState::Persisting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Mark the value as durable.
    pub fn set_persisted(&self) {
        self.state
            .store(PersistState::Persisted as u8, Ordering::Release);
    }

    /// Clear the persisted flag ahead of a delete.
    pub fn clear_persisted(&self) {
        self.state
            .store(PersistState::NotPersisted as u8, Ordering::Release);
    }

    /// The in-memory buffer, if any.
    pub fn mem(&self) -> Option<Bytes> {
        self.mem.read().expect("value lock poisoned").clone()
    }

    /// Attach a buffer, typically after a load.
    pub fn set_mem(&self, data: Bytes) {
        *self.mem.write().expect("value lock poisoned") = Some(data);
    }

    /// Drop the in-memory buffer, keeping only the reference.
    pub fn free_mem(&self) -> Option<Bytes> {
        self.mem.write().expect("value lock poisoned").take()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("key", &self.key)
            .field("max", &self.max)
            .field("state", &self.state())
            .field("in_memory", &self.mem().is_some())
            .finish()
    }
}
