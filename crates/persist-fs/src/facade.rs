use std::sync::Arc;

use persist_remote::{
    FsRegistry, RemoteError, RemoteFs, RemoteIoError, RemotePath, RemoteReader, RemoteWriter,
};
use tracing::{debug, info};

use crate::entry::PersistEntry;

/// Result alias for facade calls.
pub type FsResult<T> = Result<T, RemoteIoError>;

/// Path-string filesystem operations over any registered remote client.
///
/// Every call resolves its client afresh and is attempted once; faults come
/// back as a [`RemoteIoError`] naming the path and the active configuration.
#[derive(Clone)]
pub struct RemoteFileSystem {
    registry: Arc<FsRegistry>,
}

impl RemoteFileSystem {
    pub fn new(registry: Arc<FsRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<FsRegistry> {
        &self.registry
    }

    fn error(&self, path: &str, source: RemoteError) -> RemoteIoError {
        RemoteIoError::new(path, self.registry.config(), source)
    }

    /// Run `op` against the client for `path`.
    fn with_fs<T>(
        &self,
        path: &str,
        op: impl FnOnce(&dyn RemoteFs, &RemotePath) -> Result<T, RemoteError>,
    ) -> FsResult<T> {
        let target = self.registry.qualify(&RemotePath::new(path));
        self.registry
            .resolve(&target)
            .and_then(|fs| op(fs.as_ref(), &target))
            .map_err(|e| self.error(path, e))
    }

    pub fn exists(&self, path: &str) -> FsResult<bool> {
        self.with_fs(path, |fs, p| fs.exists(p))
    }

    /// Direct children of a directory, or the file itself.
    pub fn list(&self, path: &str) -> FsResult<Vec<PersistEntry>> {
        self.with_fs(path, |fs, p| {
            Ok(fs.list_status(p)?.iter().map(PersistEntry::from).collect())
        })
    }

    pub fn length(&self, path: &str) -> FsResult<u64> {
        self.with_fs(path, |fs, p| Ok(fs.file_status(p)?.length))
    }

    pub fn open(&self, path: &str) -> FsResult<RemoteReader> {
        self.with_fs(path, |fs, p| fs.open(p))
    }

    pub fn create(&self, path: &str, overwrite: bool) -> FsResult<RemoteWriter> {
        self.with_fs(path, |fs, p| fs.create(p, overwrite))
    }

    pub fn mkdirs(&self, path: &str) -> FsResult<bool> {
        self.with_fs(path, |fs, p| fs.mkdirs(p))
    }

    /// Rename `from` to `to`, replacing an existing `to`.
    ///
    /// Returns `Ok(false)` without renaming when the existing destination
    /// cannot be removed. Other faults are reported against `to`.
    pub fn rename(&self, from: &str, to: &str) -> FsResult<bool> {
        let source = self.registry.qualify(&RemotePath::new(from));
        let target = self.registry.qualify(&RemotePath::new(to));
        let fs = self
            .registry
            .resolve(&source)
            .map_err(|e| self.error(to, e))?;

        if fs.exists(&target).map_err(|e| self.error(to, e))? {
            match fs.delete(&target, true) {
                Ok(true) => debug!(path = %target, "removed rename destination"),
                Ok(false) | Err(_) => {
                    info!(from, to, "rename failed: destination could not be removed");
                    return Ok(false);
                }
            }
        }
        fs.rename(&source, &target).map_err(|e| self.error(to, e))
    }

    /// Delete recursively. Returns `Ok(false)` if nothing was there.
    pub fn delete(&self, path: &str) -> FsResult<bool> {
        self.with_fs(path, |fs, p| fs.delete(p, true))
    }

    /// Home directory on the default filesystem.
    pub fn home_directory(&self) -> FsResult<String> {
        let root = self.registry.qualify(&RemotePath::new("/"));
        self.registry
            .default_fs()
            .and_then(|fs| fs.home_directory())
            .map(|home| home.to_string())
            .map_err(|e| self.error(&root.to_string(), e))
    }
}

impl std::fmt::Debug for RemoteFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFileSystem")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    use persist_remote::{FsOp, InMemoryFs, RemoteConfig};

    fn facade() -> (InMemoryFs, RemoteFileSystem) {
        let registry = Arc::new(FsRegistry::new(Arc::new(RemoteConfig::with_default_fs("mem://bucket"))));
        let fs = InMemoryFs::new("mem", Some("bucket"));
        registry.mount("mem", Some("bucket"), Arc::new(fs.clone()));
        (fs, RemoteFileSystem::new(registry))
    }

    #[test]
    fn exists_length_and_list() {
        let (fs, facade) = facade();
        fs.put("/d/a", vec![0u8; 3]);
        fs.put("/d/b", vec![0u8; 5]);
        fs.put("/d/sub/c", vec![0u8; 1]);

        assert!(facade.exists("mem://bucket/d/a").unwrap());
        assert!(!facade.exists("/d/zzz").unwrap());
        assert_eq!(facade.length("/d/b").unwrap(), 5);

        let entries = facade.list("mem://bucket/d").unwrap();
        let summary: Vec<(&str, u64)> = entries.iter().map(|e| (e.name.as_str(), e.size)).collect();
        assert_eq!(summary, vec![("a", 3), ("b", 5), ("sub", 0)]);
        assert!(entries[0].timestamp_millis > 0);
    }

    #[test]
    fn create_then_open() {
        let (_fs, facade) = facade();
        let mut w = facade.create("/out/file.txt", false).unwrap();
        w.write_all(b"written").unwrap();
        drop(w);

        let mut s = String::new();
        facade.open("/out/file.txt").unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "written");
        assert!(facade.create("/out/file.txt", false).is_err());
    }

    #[test]
    fn rename_replaces_existing_destination() {
        let (fs, facade) = facade();
        fs.put("/from", &b"new"[..]);
        fs.put("/to", &b"old"[..]);

        assert!(facade.rename("/from", "/to").unwrap());
        assert_eq!(fs.get("/to").unwrap(), &b"new"[..]);
        assert!(fs.get("/from").is_none());
    }

    #[test]
    fn rename_returns_false_when_pre_delete_fails() {
        let (fs, facade) = facade();
        fs.put("/from", &b"new"[..]);
        fs.put("/to", &b"old"[..]);
        fs.inject(FsOp::Delete, "/to", RemoteError::io("AccessControlException", "denied"));

        assert!(!facade.rename("/from", "/to").unwrap());
        assert_eq!(fs.calls(FsOp::Rename), 0);
        assert_eq!(fs.get("/to").unwrap(), &b"old"[..]);
    }

    #[test]
    fn faults_carry_path_and_configuration() {
        let (fs, facade) = facade();
        fs.inject(FsOp::FileStatus, "/x", RemoteError::SocketTimeout("slow".into()));

        let err = facade.exists("/x").unwrap_err();

        assert_eq!(err.path, "/x");
        assert!(err.config.contains("mem://bucket"));
        assert_eq!(fs.calls(FsOp::FileStatus), 1);
    }

    #[test]
    fn missing_file_length_is_an_error() {
        let (_fs, facade) = facade();
        let err = facade.length("/none").unwrap_err();
        assert!(err.source.is_not_found());
    }

    #[test]
    fn mkdirs_and_recursive_delete() {
        let (fs, facade) = facade();
        assert!(facade.mkdirs("/a/b/c").unwrap());
        fs.put("/a/b/c/f", &b"x"[..]);
        assert!(facade.delete("/a").unwrap());
        assert!(!facade.exists("/a/b").unwrap());
        assert!(!facade.delete("/a").unwrap());
    }

    #[test]
    fn home_directory_of_default_fs() {
        let (_fs, facade) = facade();
        assert_eq!(facade.home_directory().unwrap(), "mem://bucket/user/persist");
    }

    #[test]
    fn local_files_through_the_facade() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(FsRegistry::new(Arc::new(RemoteConfig::default())));
        let facade = RemoteFileSystem::new(registry);
        let path = format!("{}/note.txt", dir.path().display());

        drop(facade.create(&path, true).unwrap());
        assert!(facade.exists(&path).unwrap());
        assert_eq!(facade.length(&path).unwrap(), 0);
    }

    #[test]
    fn entries_serialize_for_reporting() {
        let entry = PersistEntry {
            name: "a".into(),
            size: 1,
            timestamp_millis: 2,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"a","size":1,"timestamp_millis":2}"#);
    }
}
