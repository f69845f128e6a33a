use std::io::{self, Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use persist_remote::{FsRegistry, RemoteError, RemoteIoError, RemotePath, RemoteResult};
use persist_retry::{IoDirection, RetryExecutor};
use persist_types::Value;
use tracing::{debug, info};

use crate::addressing::{object_name, path_for_key, skip_for_key};
use crate::error::{StoreError, StoreResult};
use crate::traits::Persist;

/// Object store adapter over a remote filesystem.
///
/// Runs in one of two modes:
///
/// - **external** ([`RemotePersist::external`]): read-only access to objects
///   that already live on the remote store, addressed by their keys. Chunk
///   keys read their byte range of the parent object.
/// - **ice** ([`RemotePersist::with_ice`]): the node's own durability store.
///   Values are written whole under a per-node ice root that this adapter
///   owns exclusively, so there is never more than one writer per object.
///
/// Every remote call goes through the [`RetryExecutor`].
pub struct RemotePersist {
    registry: Arc<FsRegistry>,
    executor: Arc<RetryExecutor>,
    ice_root: Option<RemotePath>,
}

impl RemotePersist {
    /// Adapter for loading externally hosted objects.
    pub fn external(registry: Arc<FsRegistry>, executor: Arc<RetryExecutor>) -> Self {
        Self {
            registry,
            executor,
            ice_root: None,
        }
    }

    /// Adapter for the node's durability store under `base`, creating the
    /// ice root if it is missing.
    pub fn with_ice(
        registry: Arc<FsRegistry>,
        executor: Arc<RetryExecutor>,
        base: &str,
        host: &str,
        port: u16,
    ) -> StoreResult<Self> {
        let ice_root = registry.qualify(&Self::ice_root_for(base, host, port));
        let wrap = |e: RemoteError| RemoteIoError::new(ice_root.to_string(), registry.config(), e);
        registry
            .resolve(&ice_root)
            .and_then(|fs| fs.mkdirs(&ice_root))
            .map_err(wrap)?;
        info!(ice_root = %ice_root, "ice root ready");
        Ok(Self {
            registry,
            executor,
            ice_root: Some(ice_root),
        })
    }

    /// `<base>/ice<host>-<port>`.
    pub fn ice_root_for(base: &str, host: &str, port: u16) -> RemotePath {
        RemotePath::new(&format!("{}/ice{host}-{port}", base.trim_end_matches('/')))
    }

    pub fn ice_root(&self) -> Option<&RemotePath> {
        self.ice_root.as_ref()
    }

    pub fn is_ice(&self) -> bool {
        self.ice_root.is_some()
    }

    /// Where `value` lives, and the byte offset its data starts at.
    fn locate(&self, value: &Value) -> (RemotePath, u64) {
        match &self.ice_root {
            Some(root) => (root.join(&object_name(value)), 0),
            None => self.external_location(value),
        }
    }

    /// The address named by the key itself.
    fn external_location(&self, value: &Value) -> (RemotePath, u64) {
        (
            self.registry.qualify(&RemotePath::new(&path_for_key(value.key()))),
            skip_for_key(value.key()),
        )
    }

    fn ice_path(&self, value: &Value, op: &'static str) -> StoreResult<RemotePath> {
        match &self.ice_root {
            Some(root) => Ok(root.join(&object_name(value))),
            None => Err(StoreError::NotIceStore(op)),
        }
    }

    /// Read `value.max()` bytes of `path` starting at `skip`. Skip and read are
    /// retried together, restarting from the first byte.
    fn read_at(&self, value: &Value, path: &RemotePath, skip: u64) -> StoreResult<Bytes> {
        let len = value.max();
        debug!(key = %value.key(), path = %path, skip, len, "loading value");

        let data = self
            .executor
            .execute(
                || -> RemoteResult<Vec<u8>> {
                    let fs = self.registry.resolve(path)?;
                    let mut stream = fs.open(path)?;
                    skip_fully(&mut stream, skip)?;
                    let mut buf = vec![0u8; len];
                    stream.read_exact(&mut buf)?;
                    Ok(buf)
                },
                IoDirection::Read,
                len as u64,
            )
            .map_err(|source| StoreError::Remote {
                path: path.to_string(),
                source,
            })?;
        Ok(Bytes::from(data))
    }

    /// Contents of a value held only by reference, read from the key's own
    /// address. A missing source fails at once instead of being retried.
    fn load_reference(&self, value: &Value) -> StoreResult<Bytes> {
        let (path, skip) = self.external_location(value);
        let present = self
            .registry
            .resolve(&path)
            .and_then(|fs| fs.exists(&path))
            .map_err(|e| RemoteIoError::new(path.to_string(), self.registry.config(), e))
            .map_err(StoreError::Source)?;
        if !present {
            return Err(StoreError::SourceMissing {
                key: value.key().to_string(),
                path: path.to_string(),
            });
        }
        self.read_at(value, &path, skip)
    }

    /// Write `data` to `path`, creating parent directories and replacing any
    /// existing file. Transient faults are retried.
    pub fn store_bytes(&self, path: &RemotePath, data: &[u8]) -> StoreResult<()> {
        let path = self.registry.qualify(path);
        self.executor
            .execute(
                || -> RemoteResult<()> {
                    let fs = self.registry.resolve(&path)?;
                    if let Some(parent) = path.parent() {
                        fs.mkdirs(&parent)?;
                    }
                    let mut stream = fs.create(&path, true)?;
                    stream.write_all(data)?;
                    stream.flush()?;
                    Ok(())
                },
                IoDirection::Write,
                data.len() as u64,
            )
            .map_err(|source| StoreError::Remote {
                path: path.to_string(),
                source,
            })
    }
}

/// Discard exactly `n` bytes, failing with end-of-stream if the object is
/// shorter.
fn skip_fully(stream: &mut impl Read, n: u64) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut stream.take(n), &mut io::sink())?;
    if skipped < n {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("reached end of stream after skipping {skipped} of {n} bytes"),
        ));
    }
    Ok(())
}

impl Persist for RemotePersist {
    fn load(&self, value: &Value) -> StoreResult<Bytes> {
        if !value.is_persisted() {
            return Err(StoreError::NotPersisted(value.key().to_string()));
        }
        let (path, skip) = self.locate(value);
        self.read_at(value, &path, skip)
    }

    fn store(&self, value: &Value) -> StoreResult<()> {
        let path = self.ice_path(value, "store")?;
        if value.is_persisted() {
            return Err(StoreError::AlreadyPersisted(value.key().to_string()));
        }

        let data = match value.mem() {
            Some(data) => data,
            None => self.load_reference(value)?,
        };
        if data.len() != value.max() {
            return Err(StoreError::PartialBuffer {
                key: value.key().to_string(),
                expected: value.max(),
                actual: data.len(),
            });
        }

        self.store_bytes(&path, &data)?;
        value.set_persisted();
        debug!(key = %value.key(), path = %path, bytes = data.len(), "value persisted");
        Ok(())
    }

    fn delete(&self, value: &Value) -> StoreResult<()> {
        let path = self.ice_path(value, "delete")?;
        if value.is_persisted() {
            return Err(StoreError::StillPersisted(value.key().to_string()));
        }

        self.executor
            .execute(
                || -> RemoteResult<bool> { self.registry.resolve(&path)?.delete(&path, true) },
                IoDirection::Write,
                0,
            )
            .map_err(|source| StoreError::Remote {
                path: path.to_string(),
                source,
            })?;
        debug!(key = %value.key(), path = %path, "value deleted");
        Ok(())
    }
}

impl std::fmt::Debug for RemotePersist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotePersist")
            .field("ice_root", &self.ice_root.as_ref().map(ToString::to_string))
            .field("executor", &self.executor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use persist_remote::{FsOp, InMemoryFs, RemoteConfig, RemoteFs};
    use persist_retry::{IoRecorder, RetryPolicy, Timeline};
    use persist_types::{Key, PersistState, CHUNK_SIZE};

    struct Fixture {
        fs: InMemoryFs,
        timeline: Arc<Timeline>,
        registry: Arc<FsRegistry>,
        executor: Arc<RetryExecutor>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(FsRegistry::new(Arc::new(RemoteConfig::with_default_fs("mem://bucket"))));
        let fs = InMemoryFs::new("mem", Some("bucket"));
        registry.mount("mem", Some("bucket"), Arc::new(fs.clone()));
        let timeline = Arc::new(Timeline::default());
        let executor = Arc::new(RetryExecutor::new(
            RetryPolicy::default().with_delay(Duration::from_millis(1)),
            Arc::clone(&timeline) as Arc<dyn IoRecorder>,
        ));
        Fixture {
            fs,
            timeline,
            registry,
            executor,
        }
    }

    fn ice(f: &Fixture) -> RemotePersist {
        RemotePersist::with_ice(
            Arc::clone(&f.registry),
            Arc::clone(&f.executor),
            "mem://bucket/cluster",
            "10.0.0.7",
            54321,
        )
        .unwrap()
    }

    #[test]
    fn ice_root_layout() {
        let root = RemotePersist::ice_root_for("hdfs://nn/tmp/", "10.0.0.7", 54321);
        assert_eq!(root.to_string(), "hdfs://nn/tmp/ice10.0.0.7-54321");
    }

    #[test]
    fn construction_creates_ice_root() {
        let f = fixture();
        let store = ice(&f);
        let root = store.ice_root().unwrap();
        assert!(f.fs.file_status(root).unwrap().is_dir);
    }

    #[test]
    fn store_then_load_roundtrips() {
        let f = fixture();
        let store = ice(&f);
        for (i, len) in [0usize, 1, 4096].into_iter().enumerate() {
            let data: Vec<u8> = (0..len).map(|b| (b % 251) as u8).collect();
            let value = Value::new(Key::plain(format!("/frame/{i}")), data.clone());

            store.store(&value).unwrap();
            assert_eq!(value.state(), PersistState::Persisted);

            let loaded = store.load(&value).unwrap();
            assert_eq!(&loaded[..], &data[..]);
        }
        assert_eq!(f.timeline.totals(IoDirection::Write), (3, 4097));
        assert_eq!(f.timeline.totals(IoDirection::Read), (3, 4097));
    }

    #[test]
    fn chunk_values_store_whole_under_ice() {
        let f = fixture();
        let store = ice(&f);
        let value = Value::new(Key::chunk("/frame/vec", 2), vec![9u8; 16]);
        store.store(&value).unwrap();
        assert_eq!(store.load(&value).unwrap(), Bytes::from(vec![9u8; 16]));
    }

    #[test]
    fn partial_buffer_is_refused_without_io() {
        let f = fixture();
        let store = ice(&f);
        let value = Value::new(Key::plain("/short"), vec![1u8; 8]);
        value.free_mem();
        value.set_mem(Bytes::from_static(b"abc"));

        let creates_before = f.fs.calls(FsOp::Create);
        let err = store.store(&value).unwrap_err();

        assert!(matches!(err, StoreError::PartialBuffer { expected: 8, actual: 3, .. }));
        assert_eq!(f.fs.calls(FsOp::Create), creates_before);
        assert_eq!(value.state(), PersistState::NotPersisted);
    }

    #[test]
    fn store_retries_transient_create_faults() {
        let f = fixture();
        let store = ice(&f);
        let value = Value::new(Key::plain("/retry"), &b"payload"[..]);
        let path = store.ice_root().unwrap().join(&object_name(&value));
        f.fs.inject(FsOp::Create, path.path(), RemoteError::SocketTimeout("slow".into()));
        f.fs.inject(FsOp::Create, path.path(), RemoteError::io("S3Exception", "503"));

        store.store(&value).unwrap();

        assert_eq!(f.fs.get(path.path()).unwrap(), Bytes::from_static(b"payload"));
        assert!(value.is_persisted());
    }

    #[test]
    fn fatal_fault_leaves_value_unpersisted() {
        let f = fixture();
        let store = ice(&f);
        let value = Value::new(Key::plain("/fatal"), &b"x"[..]);
        let path = store.ice_root().unwrap().join(&object_name(&value));
        f.fs.inject(FsOp::Create, path.path(), RemoteError::runtime("IllegalArgumentException", "no"));

        let err = store.store(&value).unwrap_err();

        assert!(matches!(err, StoreError::Remote { .. }));
        assert!(!value.is_persisted());
    }

    #[test]
    fn store_guards() {
        let f = fixture();
        let external = RemotePersist::external(Arc::clone(&f.registry), Arc::clone(&f.executor));
        let value = Value::new(Key::plain("/x"), &b"x"[..]);
        assert!(matches!(external.store(&value), Err(StoreError::NotIceStore("store"))));

        let store = ice(&f);
        store.store(&value).unwrap();
        assert!(matches!(store.store(&value), Err(StoreError::AlreadyPersisted(_))));
        assert!(matches!(store.delete(&value), Err(StoreError::StillPersisted(_))));
    }

    #[test]
    fn store_without_buffer_reads_the_key_address() {
        let f = fixture();
        let store = ice(&f);
        f.fs.put("/data/x.csv", &b"abcd"[..]);
        let value = Value::new(Key::plain("mem://bucket/data/x.csv"), &b"abcd"[..]);
        value.free_mem();

        store.store(&value).unwrap();

        assert!(value.is_persisted());
        assert_eq!(store.load(&value).unwrap(), Bytes::from_static(b"abcd"));
        let ice_object = store.ice_root().unwrap().join(&object_name(&value));
        assert_eq!(f.fs.get(ice_object.path()).unwrap(), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn store_without_buffer_reads_chunk_range() {
        let f = fixture();
        let store = ice(&f);
        let mut object = vec![0u8; CHUNK_SIZE as usize];
        object.extend_from_slice(b"tail");
        f.fs.put("/data/big.bin", object);
        let value = Value::new(Key::chunk("mem://bucket/data/big.bin", 1), &b"tail"[..]);
        value.free_mem();

        store.store(&value).unwrap();
        assert_eq!(store.load(&value).unwrap(), Bytes::from_static(b"tail"));
    }

    #[test]
    fn store_without_buffer_fails_fast_on_missing_source() {
        let f = fixture();
        let store = ice(&f);
        let value = Value::new(Key::plain("mem://bucket/data/nowhere.csv"), &b"abcd"[..]);
        value.free_mem();

        let err = store.store(&value).unwrap_err();

        match err {
            StoreError::SourceMissing { path, .. } => assert_eq!(path, "mem://bucket/data/nowhere.csv"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.fs.calls(FsOp::Open), 0);
        assert!(!value.is_persisted());
    }

    #[test]
    fn long_chunk_key_stores_on_local_disk() {
        let dir = tempfile::tempdir().unwrap();
        let base = format!("file://{}", dir.path().display());
        let registry = Arc::new(FsRegistry::new(Arc::new(RemoteConfig::default())));
        let executor = Arc::new(RetryExecutor::new(
            RetryPolicy::default()
                .with_delay(Duration::from_millis(1))
                .with_max_elapsed(Duration::from_secs(5)),
            Arc::new(persist_retry::NullRecorder) as Arc<dyn IoRecorder>,
        ));
        let store = RemotePersist::with_ice(registry, executor, &base, "10.0.0.7", 54321).unwrap();

        let path = format!("hdfs://namenode:8020/{}", "w".repeat(117));
        let key = Key::chunk(&path, 3);
        assert_eq!(key.as_bytes().len(), 148);
        let value = Value::new(key, vec![7u8; 64]);

        store.store(&value).unwrap();
        assert_eq!(store.load(&value).unwrap(), Bytes::from(vec![7u8; 64]));

        let on_disk = dir.path().join("ice10.0.0.7-54321").join(object_name(&value));
        assert!(on_disk.is_file());
        value.clear_persisted();
        store.delete(&value).unwrap();
        assert!(!on_disk.exists());
    }

    #[test]
    fn delete_is_recursive_and_tolerates_missing() {
        let f = fixture();
        let store = ice(&f);
        let value = Value::new(Key::plain("/gone"), &b"bye"[..]);
        store.store(&value).unwrap();
        let path = store.ice_root().unwrap().join(&object_name(&value));

        value.clear_persisted();
        store.delete(&value).unwrap();
        assert!(f.fs.get(path.path()).is_none());
        store.delete(&value).unwrap();
        assert_eq!(f.timeline.totals(IoDirection::Write).1, 3);
    }

    #[test]
    fn external_chunk_load_skips_to_offset() {
        let f = fixture();
        let mut object = vec![0u8; CHUNK_SIZE as usize];
        object.extend_from_slice(b"second chunk");
        f.fs.put("/data/big.bin", object);
        let external = RemotePersist::external(Arc::clone(&f.registry), Arc::clone(&f.executor));

        let value = Value::persisted(Key::chunk("mem://bucket/data/big.bin", 1), 12);
        assert_eq!(external.load(&value).unwrap(), Bytes::from_static(b"second chunk"));
    }

    #[test]
    fn external_load_retries_from_start_after_short_read() {
        let f = fixture();
        f.fs.put("/data/small.csv", &b"a,b\n1,2\n"[..]);
        f.fs.inject(FsOp::Open, "/data/small.csv", RemoteError::EndOfStream("reset".into()));
        let external = RemotePersist::external(Arc::clone(&f.registry), Arc::clone(&f.executor));

        let value = Value::persisted(Key::plain("mem://bucket/data/small.csv"), 8);
        assert_eq!(external.load(&value).unwrap(), Bytes::from_static(b"a,b\n1,2\n"));
        assert_eq!(f.fs.calls(FsOp::Open), 2);
    }

    #[test]
    fn load_requires_persisted_value() {
        let f = fixture();
        let external = RemotePersist::external(Arc::clone(&f.registry), Arc::clone(&f.executor));
        let value = Value::new(Key::plain("/x"), &b"x"[..]);
        assert!(matches!(external.load(&value), Err(StoreError::NotPersisted(_))));
    }
}
