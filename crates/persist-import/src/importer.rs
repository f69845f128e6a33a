use std::sync::Arc;

use persist_remote::{FsRegistry, RemoteError, RemoteFs, RemoteIoError, RemotePath};
use persist_types::Key;
use tracing::{debug, info, warn};

use crate::catalog::ExternalRegistry;
use crate::error::{ImportError, ImportResult};
use crate::manifest::ImportManifest;

/// Registers every file under a remote directory as an external object.
///
/// Listing faults below the root never abort the import: the unreadable
/// directory is recorded in the manifest and its siblings are still walked.
/// Listings are not retried.
pub struct TreeImporter {
    registry: Arc<FsRegistry>,
    objects: Arc<dyn ExternalRegistry>,
}

impl TreeImporter {
    pub fn new(registry: Arc<FsRegistry>, objects: Arc<dyn ExternalRegistry>) -> Self {
        Self { registry, objects }
    }

    fn wrap(&self, path: &RemotePath) -> impl Fn(RemoteError) -> RemoteIoError + '_ {
        let path = path.to_string();
        move |e| RemoteIoError::new(path.clone(), self.registry.config(), e)
    }

    /// Import the tree rooted at `root`.
    ///
    /// A root that does not exist yields an empty manifest with one failure.
    /// Faults resolving the root or checking its existence are returned.
    pub fn import(&self, root: &str) -> ImportResult<ImportManifest> {
        let mut root = RemotePath::new(root);
        // Some object-store clients cannot list `scheme://bucket` itself.
        if root.is_bare_authority() {
            root = RemotePath::from_parts(root.scheme(), root.authority(), "/");
        }
        let root = self.registry.qualify(&root);

        let fs = self.registry.resolve(&root).map_err(self.wrap(&root))?;
        if !fs.exists(&root).map_err(self.wrap(&root))? {
            warn!(root = %root, "import root does not exist");
            return Ok(ImportManifest::failed(format!("Path does not exist: '{root}'")));
        }

        let manifest = self.walk(fs.as_ref(), &root);
        info!(
            root = %root,
            keys = manifest.keys.len(),
            failures = manifest.failures.len(),
            "import finished"
        );
        Ok(manifest)
    }

    fn walk(&self, fs: &dyn RemoteFs, dir: &RemotePath) -> ImportManifest {
        let entries = match fs.list_status(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir, error = %e, "unable to list directory, skipping");
                return ImportManifest::failed(dir.to_string());
            }
        };

        let mut manifest = ImportManifest::new();
        let mut files = Vec::new();
        for status in entries {
            if status.is_dir {
                manifest.merge(self.walk(fs, &status.path));
            } else {
                files.push((status.path.to_string(), status.length));
            }
        }
        if !files.is_empty() {
            let keys = self.objects.register_external_objects(&files);
            debug!(path = %dir, files = keys.len(), "registered directory");
            manifest.keys.extend(keys);
        }
        manifest
    }

    /// Register the single file addressed by `uri`.
    pub fn import_uri(&self, uri: &str) -> ImportResult<Key> {
        let path = self.registry.qualify(&RemotePath::new(uri));
        let fs = self.registry.resolve(&path).map_err(self.wrap(&path))?;
        let listing = fs.list_status(&path).map_err(self.wrap(&path))?;
        match listing.as_slice() {
            [status] if !status.is_dir => {
                Ok(self
                    .objects
                    .register_external_object(&status.path.to_string(), status.length))
            }
            _ => Err(ImportError::NotASingleFile {
                uri: path.to_string(),
                entries: listing.len(),
            }),
        }
    }
}

impl std::fmt::Debug for TreeImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeImporter")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ObjectCatalog;
    use persist_remote::{FsOp, InMemoryFs, RemoteConfig};

    fn setup() -> (InMemoryFs, Arc<ObjectCatalog>, TreeImporter) {
        let registry = Arc::new(FsRegistry::new(Arc::new(RemoteConfig::default())));
        let fs = InMemoryFs::new("mem", Some("bucket"));
        registry.mount("mem", Some("bucket"), Arc::new(fs.clone()));
        let catalog = Arc::new(ObjectCatalog::new());
        let importer = TreeImporter::new(registry, Arc::clone(&catalog) as Arc<dyn ExternalRegistry>);
        (fs, catalog, importer)
    }

    #[test]
    fn import_tree_with_unlistable_directory() {
        let (fs, catalog, importer) = setup();
        fs.put("/root/a.txt", vec![b'a'; 10]);
        fs.put("/root/sub/b.txt", vec![b'b'; 20]);
        fs.put("/root/badSub/c.txt", vec![b'c'; 5]);
        fs.inject(
            FsOp::ListStatus,
            "/root/badSub",
            RemoteError::io("AccessControlException", "permission denied"),
        );

        let manifest = importer.import("mem://bucket/root").unwrap();

        let mut keys: Vec<String> = manifest.keys.iter().map(ToString::to_string).collect();
        keys.sort();
        assert_eq!(keys, vec!["mem://bucket/root/a.txt", "mem://bucket/root/sub/b.txt"]);
        assert_eq!(manifest.failures, vec!["mem://bucket/root/badSub".to_string()]);

        let b = catalog.get(&Key::plain("mem://bucket/root/sub/b.txt")).unwrap();
        assert_eq!(b.length(), 20);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn missing_root_is_a_single_failure() {
        let (_fs, catalog, importer) = setup();
        let manifest = importer.import("mem://bucket/nope").unwrap();
        assert!(manifest.keys.is_empty());
        assert_eq!(manifest.failures, vec!["Path does not exist: 'mem://bucket/nope'".to_string()]);
        assert!(catalog.is_empty());
    }

    #[test]
    fn bare_bucket_behaves_like_bucket_root() {
        let (fs, _catalog, importer) = setup();
        fs.put("/x.csv", vec![1u8; 3]);
        fs.put("/dir/y.csv", vec![2u8; 4]);

        let bare = importer.import("mem://bucket").unwrap();
        let slashed = importer.import("mem://bucket/").unwrap();

        assert!(bare.is_clean());
        assert_eq!(bare.keys.len(), 2);
        assert_eq!(bare, slashed);
    }

    #[test]
    fn nested_failures_do_not_stop_siblings() {
        let (fs, _catalog, importer) = setup();
        fs.put("/t/one/deep/f", vec![0u8; 1]);
        fs.put("/t/two/g", vec![0u8; 1]);
        fs.inject(FsOp::ListStatus, "/t/one/deep", RemoteError::runtime("NullPointerException", "x"));

        let manifest = importer.import("mem://bucket/t").unwrap();

        assert_eq!(manifest.keys, vec![Key::plain("mem://bucket/t/two/g")]);
        assert_eq!(manifest.failures, vec!["mem://bucket/t/one/deep".to_string()]);
    }

    #[test]
    fn root_existence_fault_is_returned() {
        let (fs, _catalog, importer) = setup();
        fs.put("/r/f", vec![0u8; 1]);
        fs.inject(FsOp::FileStatus, "/r", RemoteError::SocketTimeout("slow".into()));
        let err = importer.import("mem://bucket/r").unwrap_err();
        assert!(err.to_string().contains("mem://bucket/r"));
    }

    #[test]
    fn import_single_uri() {
        let (fs, catalog, importer) = setup();
        fs.put("/data/one.csv", vec![0u8; 42]);
        fs.put("/data/two.csv", vec![0u8; 1]);

        let key = importer.import_uri("mem://bucket/data/one.csv").unwrap();
        assert_eq!(key, Key::plain("mem://bucket/data/one.csv"));
        assert_eq!(catalog.get(&key).unwrap().length(), 42);

        let err = importer.import_uri("mem://bucket/data").unwrap_err();
        assert!(matches!(err, ImportError::NotASingleFile { entries: 2, .. }));
    }

    #[test]
    fn unknown_scheme_fails_import() {
        let (_fs, _catalog, importer) = setup();
        assert!(matches!(
            importer.import_uri("gopher://host/file"),
            Err(ImportError::Remote(_))
        ));
    }

    #[test]
    fn imported_chunks_load_lazily() {
        use persist_retry::RetryExecutor;
        use persist_store::{Persist, RemotePersist};
        use persist_types::CHUNK_SIZE;

        let registry = Arc::new(FsRegistry::new(Arc::new(RemoteConfig::default())));
        let fs = InMemoryFs::new("mem", Some("bucket"));
        registry.mount("mem", Some("bucket"), Arc::new(fs.clone()));
        let catalog = Arc::new(ObjectCatalog::new());
        let importer = TreeImporter::new(Arc::clone(&registry), Arc::clone(&catalog) as Arc<dyn ExternalRegistry>);

        let mut data = vec![7u8; CHUNK_SIZE as usize];
        data.extend_from_slice(b"tail");
        fs.put("/in/big.bin", data);

        let key = importer.import_uri("mem://bucket/in/big.bin").unwrap();
        let object = catalog.get(&key).unwrap();
        assert_eq!(object.chunk_count(), 2);

        let store = RemotePersist::external(registry, Arc::new(RetryExecutor::default()));
        let tail = object.chunk(1).unwrap();
        assert_eq!(&store.load(&tail).unwrap()[..], b"tail");
    }
}
