//! Importing externally hosted file trees into remote-persist.
//!
//! [`TreeImporter`] walks a remote directory and registers each file with an
//! [`ExternalRegistry`] as a lazily loadable object. [`ObjectCatalog`] is the
//! in-process registry; its [`FileObject`]s hand out per-chunk descriptors
//! that an external-mode [`RemotePersist`](persist_store::RemotePersist)
//! can load.

pub mod catalog;
pub mod error;
pub mod importer;
pub mod manifest;

pub use catalog::{ExternalRegistry, FileObject, ObjectCatalog};
pub use error::{ImportError, ImportResult};
pub use importer::TreeImporter;
pub use manifest::ImportManifest;
