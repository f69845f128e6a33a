use std::fmt;

use serde::{Deserialize, Serialize};

/// A remote path: optional scheme and authority plus a hierarchical part.
///
/// `hdfs://nn:8020/data/x.csv` parses to scheme `hdfs`, authority `nn:8020`
/// and path `/data/x.csv`. Paths without a scheme are resolved against the
/// configured default filesystem. A bare bucket such as `s3n://bucket` keeps
/// an empty hierarchical part; some clients reject listings of it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemotePath {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
}

impl RemotePath {
    /// Parse a path string. Never fails; unknown shapes are kept verbatim as
    /// the hierarchical part.
    pub fn new(s: &str) -> Self {
        match s.split_once("://") {
            Some((scheme, rest)) if is_scheme(scheme) => {
                let (authority, path) = match rest.find('/') {
                    Some(idx) => (&rest[..idx], &rest[idx..]),
                    None => (rest, ""),
                };
                Self {
                    scheme: Some(scheme.to_ascii_lowercase()),
                    authority: (!authority.is_empty()).then(|| authority.to_string()),
                    path: normalize(path),
                }
            }
            _ => Self {
                scheme: None,
                authority: None,
                path: normalize(s),
            },
        }
    }

    /// Build a path from its parts.
    pub fn from_parts(scheme: Option<&str>, authority: Option<&str>, path: &str) -> Self {
        Self {
            scheme: scheme.map(str::to_ascii_lowercase),
            authority: authority.filter(|a| !a.is_empty()).map(str::to_string),
            path: normalize(path),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The hierarchical part, e.g. `/data/x.csv`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `true` for `scheme://authority` with no hierarchical part at all.
    pub fn is_bare_authority(&self) -> bool {
        self.scheme.is_some() && self.path.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// The parent directory, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.path.is_empty() || self.is_root() {
            return None;
        }
        let parent = match self.path.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => self.path[..idx].to_string(),
            None => return None,
        };
        Some(Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: parent,
        })
    }

    /// Append a child segment (or a relative multi-segment path).
    pub fn join(&self, child: &str) -> Self {
        let child = child.trim_start_matches('/');
        let path = if self.path.is_empty() || self.is_root() {
            format!("/{child}")
        } else {
            format!("{}/{child}", self.path)
        };
        Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: normalize(&path),
        }
    }

    /// Fill in scheme and authority when this path has none.
    pub fn qualify(&self, scheme: &str, authority: Option<&str>) -> Self {
        if self.scheme.is_some() {
            return self.clone();
        }
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        Self::from_parts(Some(scheme), authority, &path)
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Collapse repeated separators and drop a trailing one (except for `/`).
fn normalize(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let absolute = path.starts_with('/');
    let joined = path
        .split('/')
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://{}", self.authority.as_deref().unwrap_or(""))?;
        }
        write!(f, "{}", self.path)
    }
}

impl fmt::Debug for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemotePath({self})")
    }
}

impl From<&str> for RemotePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Status record returned by listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStatus {
    /// Fully qualified path of the entry.
    pub path: RemotePath,
    /// Length in bytes; zero for directories.
    pub length: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub modification_time: u64,
    pub is_dir: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_uri() {
        let p = RemotePath::new("hdfs://nn:8020/data//x.csv/");
        assert_eq!(p.scheme(), Some("hdfs"));
        assert_eq!(p.authority(), Some("nn:8020"));
        assert_eq!(p.path(), "/data/x.csv");
        assert_eq!(p.to_string(), "hdfs://nn:8020/data/x.csv");
    }

    #[test]
    fn parse_bare_bucket() {
        let bare = RemotePath::new("s3n://bucket");
        assert!(bare.is_bare_authority());
        assert_eq!(bare.path(), "");
        let slashed = RemotePath::new("s3n://bucket/");
        assert!(!slashed.is_bare_authority());
        assert!(slashed.is_root());
    }

    #[test]
    fn parse_schemeless() {
        let p = RemotePath::new("/user/data");
        assert_eq!(p.scheme(), None);
        assert_eq!(p.path(), "/user/data");
        let q = p.qualify("hdfs", Some("nn"));
        assert_eq!(q.to_string(), "hdfs://nn/user/data");
    }

    #[test]
    fn file_uri_has_no_authority() {
        let p = RemotePath::new("file:///tmp/x");
        assert_eq!(p.scheme(), Some("file"));
        assert_eq!(p.authority(), None);
        assert_eq!(p.path(), "/tmp/x");
        assert_eq!(p.to_string(), "file:///tmp/x");
    }

    #[test]
    fn parent_and_name() {
        let p = RemotePath::new("mem://b/a/b/c.txt");
        assert_eq!(p.name(), "c.txt");
        let parent = p.parent().unwrap();
        assert_eq!(parent.to_string(), "mem://b/a/b");
        assert_eq!(RemotePath::new("mem://b/a").parent().unwrap().to_string(), "mem://b/");
        assert!(RemotePath::new("mem://b/").parent().is_none());
    }

    #[test]
    fn join_segments() {
        let root = RemotePath::new("mem://b/");
        assert_eq!(root.join("x").to_string(), "mem://b/x");
        assert_eq!(root.join("x").join("y/z").to_string(), "mem://b/x/y/z");
        assert_eq!(RemotePath::new("mem://b").join("x").to_string(), "mem://b/x");
    }
}
