//! Object store adapter for remote-persist.
//!
//! Maps key-value store values onto objects on a remote filesystem:
//!
//! - [`addressing`] turns keys into remote paths, chunk offsets, and ice
//!   object names
//! - [`Persist`] is the load/store/delete surface the key-value store drives
//! - [`RemotePersist`] implements it on top of an
//!   [`FsRegistry`](persist_remote::FsRegistry) and a
//!   [`RetryExecutor`](persist_retry::RetryExecutor)

pub mod adapter;
pub mod addressing;
pub mod error;
pub mod traits;

pub use adapter::RemotePersist;
pub use addressing::{object_name, path_for_key, skip_for_key};
pub use error::{StoreError, StoreResult};
pub use traits::Persist;
