use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::client::{RemoteFs, RemoteReader, RemoteWriter};
use crate::error::{RemoteError, RemoteResult};
use crate::path::{FileStatus, RemotePath};

/// Client operations, used to target injected faults and count calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FsOp {
    Open,
    Create,
    Delete,
    Rename,
    Mkdirs,
    ListStatus,
    FileStatus,
}

#[derive(Clone, Debug)]
enum Node {
    Dir { mtime: u64 },
    File { data: Bytes, mtime: u64 },
}

struct Inner {
    scheme: String,
    authority: Option<String>,
    nodes: RwLock<BTreeMap<String, Node>>,
    faults: Mutex<HashMap<(FsOp, String), VecDeque<RemoteError>>>,
    calls: Mutex<HashMap<FsOp, usize>>,
}

/// In-memory remote filesystem for tests and embedding.
///
/// Behaves like a small object store: a tree of directories and immutable
/// file blobs behind an `RwLock`. Faults can be queued per operation and
/// path with [`InMemoryFs::inject`]; each queued fault is returned by
/// exactly one call. Listing a bare authority (`mem://bucket`, no trailing
/// separator) fails the way some object-store clients do.
#[derive(Clone)]
pub struct InMemoryFs {
    inner: Arc<Inner>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Canonical node key: absolute, no trailing separator, root is `/`.
fn key_of(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent_key(key: &str) -> Option<String> {
    if key == "/" {
        return None;
    }
    match key.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(key[..idx].to_string()),
        None => None,
    }
}

fn child_prefix(key: &str) -> String {
    if key == "/" {
        "/".to_string()
    } else {
        format!("{key}/")
    }
}

impl InMemoryFs {
    pub fn new(scheme: &str, authority: Option<&str>) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { mtime: now_ms() });
        Self {
            inner: Arc::new(Inner {
                scheme: scheme.to_string(),
                authority: authority.map(str::to_string),
                nodes: RwLock::new(nodes),
                faults: Mutex::new(HashMap::new()),
                calls: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Write a file directly, creating parent directories.
    pub fn put(&self, path: &str, data: impl Into<Bytes>) {
        let key = key_of(path);
        let mut nodes = self.inner.nodes.write().expect("memory fs lock poisoned");
        Self::mkdirs_locked(&mut nodes, parent_key(&key).as_deref().unwrap_or("/"));
        nodes.insert(
            key,
            Node::File {
                data: data.into(),
                mtime: now_ms(),
            },
        );
    }

    /// Contents of a file, if present.
    pub fn get(&self, path: &str) -> Option<Bytes> {
        let nodes = self.inner.nodes.read().expect("memory fs lock poisoned");
        match nodes.get(&key_of(path)) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Queue `err` to be returned by the next `op` against `path`.
    pub fn inject(&self, op: FsOp, path: &str, err: RemoteError) {
        self.inner
            .faults
            .lock()
            .expect("memory fs lock poisoned")
            .entry((op, key_of(path)))
            .or_default()
            .push_back(err);
    }

    /// Number of `op` calls made so far.
    pub fn calls(&self, op: FsOp) -> usize {
        self.inner
            .calls
            .lock()
            .expect("memory fs lock poisoned")
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Count the call and pop any fault queued for it.
    fn enter(&self, op: FsOp, key: &str) -> RemoteResult<()> {
        *self
            .inner
            .calls
            .lock()
            .expect("memory fs lock poisoned")
            .entry(op)
            .or_insert(0) += 1;
        let queued = self
            .inner
            .faults
            .lock()
            .expect("memory fs lock poisoned")
            .get_mut(&(op, key.to_string()))
            .and_then(VecDeque::pop_front);
        match queued {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn qualified(&self, key: &str) -> RemotePath {
        RemotePath::from_parts(Some(&self.inner.scheme), self.inner.authority.as_deref(), key)
    }

    fn status_of(&self, key: &str, node: &Node) -> FileStatus {
        match node {
            Node::Dir { mtime } => FileStatus {
                path: self.qualified(key),
                length: 0,
                modification_time: *mtime,
                is_dir: true,
            },
            Node::File { data, mtime } => FileStatus {
                path: self.qualified(key),
                length: data.len() as u64,
                modification_time: *mtime,
                is_dir: false,
            },
        }
    }

    fn mkdirs_locked(nodes: &mut BTreeMap<String, Node>, key: &str) -> bool {
        let mut missing = Vec::new();
        let mut cursor = Some(key.to_string());
        while let Some(k) = cursor {
            match nodes.get(&k) {
                Some(Node::Dir { .. }) => break,
                Some(Node::File { .. }) => return false,
                None => {
                    cursor = parent_key(&k);
                    missing.push(k);
                }
            }
        }
        let mtime = now_ms();
        for k in missing {
            nodes.insert(k, Node::Dir { mtime });
        }
        true
    }

    fn commit(&self, key: &str, data: Bytes) {
        let mut nodes = self.inner.nodes.write().expect("memory fs lock poisoned");
        nodes.insert(
            key.to_string(),
            Node::File {
                data,
                mtime: now_ms(),
            },
        );
    }
}

impl std::fmt::Debug for InMemoryFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .inner
            .nodes
            .read()
            .map(|n| n.len())
            .unwrap_or(0);
        f.debug_struct("InMemoryFs")
            .field("root", &self.qualified("/").to_string())
            .field("node_count", &count)
            .finish()
    }
}

/// Buffers writes and publishes the blob on flush and on drop.
struct MemWriter {
    fs: InMemoryFs,
    key: String,
    buf: Vec<u8>,
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.fs.commit(&self.key, Bytes::copy_from_slice(&self.buf));
        Ok(())
    }
}

impl Drop for MemWriter {
    fn drop(&mut self) {
        self.fs
            .commit(&self.key, Bytes::from(std::mem::take(&mut self.buf)));
    }
}

impl RemoteFs for InMemoryFs {
    fn open(&self, path: &RemotePath) -> RemoteResult<RemoteReader> {
        let key = key_of(path.path());
        self.enter(FsOp::Open, &key)?;
        let nodes = self.inner.nodes.read().expect("memory fs lock poisoned");
        match nodes.get(&key) {
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Dir { .. }) => Err(RemoteError::io(
                "FileNotFoundException",
                format!("{path} is a directory"),
            )),
            None => Err(RemoteError::NotFound(path.to_string())),
        }
    }

    fn create(&self, path: &RemotePath, overwrite: bool) -> RemoteResult<RemoteWriter> {
        let key = key_of(path.path());
        self.enter(FsOp::Create, &key)?;
        {
            let mut nodes = self.inner.nodes.write().expect("memory fs lock poisoned");
            match nodes.get(&key) {
                Some(Node::Dir { .. }) => {
                    return Err(RemoteError::io(
                        "FileAlreadyExistsException",
                        format!("{path} is a directory"),
                    ))
                }
                Some(Node::File { .. }) if !overwrite => {
                    return Err(RemoteError::io(
                        "FileAlreadyExistsException",
                        format!("{path} already exists"),
                    ))
                }
                _ => {}
            }
            let parent = parent_key(&key).unwrap_or_else(|| "/".to_string());
            if !Self::mkdirs_locked(&mut nodes, &parent) {
                return Err(RemoteError::io(
                    "ParentNotDirectoryException",
                    format!("parent of {path} is a file"),
                ));
            }
            nodes.insert(
                key.clone(),
                Node::File {
                    data: Bytes::new(),
                    mtime: now_ms(),
                },
            );
        }
        Ok(Box::new(MemWriter {
            fs: self.clone(),
            key,
            buf: Vec::new(),
        }))
    }

    fn delete(&self, path: &RemotePath, recursive: bool) -> RemoteResult<bool> {
        let key = key_of(path.path());
        self.enter(FsOp::Delete, &key)?;
        let mut nodes = self.inner.nodes.write().expect("memory fs lock poisoned");
        match nodes.get(&key) {
            None => Ok(false),
            Some(Node::File { .. }) => {
                nodes.remove(&key);
                Ok(true)
            }
            Some(Node::Dir { .. }) => {
                let prefix = child_prefix(&key);
                let children: Vec<String> = nodes
                    .range(prefix.clone()..)
                    .take_while(|(k, _)| k.starts_with(&prefix))
                    .filter(|(k, _)| **k != key)
                    .map(|(k, _)| k.clone())
                    .collect();
                if !children.is_empty() && !recursive {
                    return Err(RemoteError::io(
                        "PathIsNotEmptyDirectoryException",
                        format!("{path} is non empty"),
                    ));
                }
                for child in children {
                    nodes.remove(&child);
                }
                if key != "/" {
                    nodes.remove(&key);
                }
                Ok(true)
            }
        }
    }

    fn rename(&self, from: &RemotePath, to: &RemotePath) -> RemoteResult<bool> {
        let src = key_of(from.path());
        let dst = key_of(to.path());
        self.enter(FsOp::Rename, &src)?;
        let mut nodes = self.inner.nodes.write().expect("memory fs lock poisoned");
        if src == "/" || !nodes.contains_key(&src) || nodes.contains_key(&dst) {
            return Ok(false);
        }
        match parent_key(&dst).and_then(|p| nodes.get(&p).cloned()) {
            Some(Node::Dir { .. }) => {}
            _ => return Ok(false),
        }
        let prefix = child_prefix(&src);
        let moved: Vec<String> = nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        if let Some(node) = nodes.remove(&src) {
            nodes.insert(dst.clone(), node);
        }
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let renamed = format!("{dst}/{}", &old[prefix.len()..]);
                nodes.insert(renamed, node);
            }
        }
        Ok(true)
    }

    fn mkdirs(&self, path: &RemotePath) -> RemoteResult<bool> {
        let key = key_of(path.path());
        self.enter(FsOp::Mkdirs, &key)?;
        let mut nodes = self.inner.nodes.write().expect("memory fs lock poisoned");
        if Self::mkdirs_locked(&mut nodes, &key) {
            Ok(true)
        } else {
            Err(RemoteError::io(
                "ParentNotDirectoryException",
                format!("{path} crosses a file"),
            ))
        }
    }

    fn list_status(&self, path: &RemotePath) -> RemoteResult<Vec<FileStatus>> {
        if path.is_bare_authority() {
            return Err(RemoteError::runtime(
                "NullPointerException",
                format!("cannot list bare bucket {path}"),
            ));
        }
        let key = key_of(path.path());
        self.enter(FsOp::ListStatus, &key)?;
        let nodes = self.inner.nodes.read().expect("memory fs lock poisoned");
        match nodes.get(&key) {
            None => Err(RemoteError::NotFound(path.to_string())),
            Some(Node::Dir { .. }) => {
                let prefix = child_prefix(&key);
                Ok(nodes
                    .range(prefix.clone()..)
                    .take_while(|(k, _)| k.starts_with(&prefix))
                    .filter(|(k, _)| k.len() > prefix.len() && !k[prefix.len()..].contains('/'))
                    .map(|(k, node)| self.status_of(k, node))
                    .collect())
            }
            Some(node) => Ok(vec![self.status_of(&key, node)]),
        }
    }

    fn file_status(&self, path: &RemotePath) -> RemoteResult<FileStatus> {
        let key = key_of(path.path());
        self.enter(FsOp::FileStatus, &key)?;
        let nodes = self.inner.nodes.read().expect("memory fs lock poisoned");
        nodes
            .get(&key)
            .map(|node| self.status_of(&key, node))
            .ok_or_else(|| RemoteError::NotFound(path.to_string()))
    }

    fn home_directory(&self) -> RemoteResult<RemotePath> {
        Ok(self.qualified("/user/persist"))
    }
}
