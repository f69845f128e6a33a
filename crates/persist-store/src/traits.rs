use bytes::Bytes;
use persist_types::Value;

use crate::error::StoreResult;

/// Durability backend driven by the key-value store.
///
/// The caller owns the persistence flag protocol:
/// - `load` is only called on persisted values.
/// - `store` is only called on values that are not yet persisted, and
///   flips them to persisted on success.
/// - `delete` is only called after the caller cleared the flag.
pub trait Persist: Send + Sync {
    /// Read the value's full contents.
    fn load(&self, value: &Value) -> StoreResult<Bytes>;

    /// Write the value's contents and mark it persisted.
    fn store(&self, value: &Value) -> StoreResult<()>;

    /// Remove the value's backing object.
    fn delete(&self, value: &Value) -> StoreResult<()>;
}
