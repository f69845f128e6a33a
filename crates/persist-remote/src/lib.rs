//! Remote filesystem client surface for remote-persist.
//!
//! This crate defines what the rest of the workspace consumes from a remote
//! filesystem: structured [`RemotePath`]s, the [`RemoteFs`] client trait, the
//! [`RemoteError`] fault taxonomy that retry classification reads, and the
//! shared immutable [`RemoteConfig`] from which clients are resolved through
//! an [`FsRegistry`].
//!
//! # Clients
//!
//! - [`LocalFs`]: `file://` paths on the local disk
//! - [`InMemoryFs`]: `mem://` object-store lookalike with fault injection,
//!   for tests and embedding
//!
//! Other schemes plug in through [`FsRegistry::register_scheme`].

pub mod client;
pub mod config;
pub mod error;
pub mod local;
pub mod memory;
pub mod path;
pub mod registry;

pub use client::{RemoteFs, RemoteReader, RemoteWriter};
pub use config::{RemoteConfig, DEFAULT_FS_KEY, LEGACY_DEFAULT_FS_KEY};
pub use error::{ConfigError, FaultCategory, RemoteError, RemoteIoError, RemoteResult};
pub use local::LocalFs;
pub use memory::{FsOp, InMemoryFs};
pub use path::{FileStatus, RemotePath};
pub use registry::{FsFactory, FsRegistry};
