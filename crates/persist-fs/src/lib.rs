//! Generic filesystem operations for remote-persist.
//!
//! [`RemoteFileSystem`] exposes exists, list, length, open, create, mkdirs,
//! rename, delete, and home-directory lookups over whatever client the
//! [`FsRegistry`](persist_remote::FsRegistry) resolves for a path. It is a
//! thin pass-through: nothing here is retried.

pub mod entry;
pub mod facade;

pub use entry::PersistEntry;
pub use facade::{FsResult, RemoteFileSystem};
