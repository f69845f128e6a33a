use std::io::{Read, Write};

use crate::error::{RemoteError, RemoteResult};
use crate::path::{FileStatus, RemotePath};

/// Readable stream returned by [`RemoteFs::open`].
pub type RemoteReader = Box<dyn Read + Send>;

/// Writable stream returned by [`RemoteFs::create`]. Data is durable once
/// the stream has been flushed and dropped.
pub type RemoteWriter = Box<dyn Write + Send>;

/// The capability set consumed from a remote filesystem client.
///
/// Implementations must be thread-safe: one client instance is shared by
/// every in-flight operation against its scheme and authority. Only the
/// hierarchical part of a [`RemotePath`] is meaningful to a client; scheme
/// and authority were already used to pick it.
pub trait RemoteFs: Send + Sync {
    /// Open a file for reading from its first byte.
    fn open(&self, path: &RemotePath) -> RemoteResult<RemoteReader>;

    /// Create a file, including missing parent directories.
    ///
    /// Fails if the file exists and `overwrite` is `false`.
    fn create(&self, path: &RemotePath, overwrite: bool) -> RemoteResult<RemoteWriter>;

    /// Delete a file or directory. Returns `Ok(false)` if nothing was there.
    ///
    /// Deleting a non-empty directory requires `recursive`.
    fn delete(&self, path: &RemotePath, recursive: bool) -> RemoteResult<bool>;

    /// Rename `from` to `to`. Returns `Ok(false)` when the rename could not
    /// be performed (missing source, existing destination).
    fn rename(&self, from: &RemotePath, to: &RemotePath) -> RemoteResult<bool>;

    /// Create a directory and all missing ancestors.
    fn mkdirs(&self, path: &RemotePath) -> RemoteResult<bool>;

    /// List a directory's direct children, or the file itself when `path`
    /// names a file.
    fn list_status(&self, path: &RemotePath) -> RemoteResult<Vec<FileStatus>>;

    /// Status of a single entry.
    fn file_status(&self, path: &RemotePath) -> RemoteResult<FileStatus>;

    fn exists(&self, path: &RemotePath) -> RemoteResult<bool> {
        match self.file_status(path) {
            Ok(_) => Ok(true),
            Err(RemoteError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The current user's home directory on this filesystem.
    fn home_directory(&self) -> RemoteResult<RemotePath>;
}
