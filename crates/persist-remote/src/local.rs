use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::client::{RemoteFs, RemoteReader, RemoteWriter};
use crate::error::{RemoteError, RemoteResult};
use crate::path::{FileStatus, RemotePath};

/// Client for `file://` paths on the local disk.
#[derive(Clone, Debug)]
pub struct LocalFs {
    home: PathBuf,
}

impl LocalFs {
    /// `home` overrides the reported home directory; otherwise `$HOME`.
    pub fn new(home: Option<&str>) -> Self {
        let home = home
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("/"));
        Self { home }
    }

    fn local(path: &RemotePath) -> PathBuf {
        if path.path().is_empty() {
            PathBuf::from("/")
        } else {
            PathBuf::from(path.path())
        }
    }

    fn status(path: &RemotePath, local: &Path) -> RemoteResult<FileStatus> {
        let meta = fs::metadata(local).map_err(|e| with_path(e, local))?;
        let modification_time = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(FileStatus {
            path: path.qualify("file", None),
            length: if meta.is_dir() { 0 } else { meta.len() },
            modification_time,
            is_dir: meta.is_dir(),
        })
    }
}

fn with_path(err: std::io::Error, path: &Path) -> RemoteError {
    let kind = err.kind();
    RemoteError::from(std::io::Error::new(kind, format!("{}: {err}", path.display())))
}

impl RemoteFs for LocalFs {
    fn open(&self, path: &RemotePath) -> RemoteResult<RemoteReader> {
        let local = Self::local(path);
        let file = fs::File::open(&local).map_err(|e| with_path(e, &local))?;
        Ok(Box::new(file))
    }

    fn create(&self, path: &RemotePath, overwrite: bool) -> RemoteResult<RemoteWriter> {
        let local = Self::local(path);
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| with_path(e, parent))?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(&local).map_err(|e| with_path(e, &local))?;
        Ok(Box::new(file))
    }

    fn delete(&self, path: &RemotePath, recursive: bool) -> RemoteResult<bool> {
        let local = Self::local(path);
        let meta = match fs::symlink_metadata(&local) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(with_path(e, &local)),
        };
        let result = if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&local)
            } else {
                fs::remove_dir(&local)
            }
        } else {
            fs::remove_file(&local)
        };
        result.map_err(|e| with_path(e, &local))?;
        Ok(true)
    }

    fn rename(&self, from: &RemotePath, to: &RemotePath) -> RemoteResult<bool> {
        let src = Self::local(from);
        let dst = Self::local(to);
        if !src.exists() || dst.exists() {
            return Ok(false);
        }
        fs::rename(&src, &dst).map_err(|e| with_path(e, &src))?;
        Ok(true)
    }

    fn mkdirs(&self, path: &RemotePath) -> RemoteResult<bool> {
        let local = Self::local(path);
        fs::create_dir_all(&local).map_err(|e| with_path(e, &local))?;
        Ok(true)
    }

    fn list_status(&self, path: &RemotePath) -> RemoteResult<Vec<FileStatus>> {
        let local = Self::local(path);
        let status = Self::status(path, &local)?;
        if !status.is_dir {
            return Ok(vec![status]);
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&local).map_err(|e| with_path(e, &local))? {
            let entry = entry.map_err(|e| with_path(e, &local))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = path.join(&name);
            entries.push(Self::status(&child, &entry.path())?);
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn file_status(&self, path: &RemotePath) -> RemoteResult<FileStatus> {
        Self::status(path, &Self::local(path))
    }

    fn home_directory(&self) -> RemoteResult<RemotePath> {
        Ok(RemotePath::from_parts(
            Some("file"),
            None,
            &self.home.to_string_lossy(),
        ))
    }
}
