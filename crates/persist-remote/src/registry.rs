use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::client::RemoteFs;
use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::local::LocalFs;
use crate::memory::InMemoryFs;
use crate::path::RemotePath;

/// Builds a client for one scheme and authority.
pub trait FsFactory: Send + Sync {
    fn create(
        &self,
        scheme: &str,
        authority: Option<&str>,
        config: &RemoteConfig,
    ) -> RemoteResult<Arc<dyn RemoteFs>>;
}

impl<F> FsFactory for F
where
    F: Fn(&str, Option<&str>, &RemoteConfig) -> RemoteResult<Arc<dyn RemoteFs>> + Send + Sync,
{
    fn create(
        &self,
        scheme: &str,
        authority: Option<&str>,
        config: &RemoteConfig,
    ) -> RemoteResult<Arc<dyn RemoteFs>> {
        self(scheme, authority, config)
    }
}

type FsKey = (String, Option<String>);

fn local_factory(
    _scheme: &str,
    _authority: Option<&str>,
    config: &RemoteConfig,
) -> RemoteResult<Arc<dyn RemoteFs>> {
    Ok(Arc::new(LocalFs::new(config.home_dir.as_deref())))
}

fn memory_factory(
    scheme: &str,
    authority: Option<&str>,
    _config: &RemoteConfig,
) -> RemoteResult<Arc<dyn RemoteFs>> {
    Ok(Arc::new(InMemoryFs::new(scheme, authority)))
}

/// Scheme used for scheme-less paths when no default filesystem is set.
pub const FALLBACK_SCHEME: &str = "file";

/// Resolves remote paths to shared client handles.
///
/// Holds the immutable [`RemoteConfig`] and caches one client per
/// (scheme, authority), so every caller resolving the same filesystem
/// shares the same instance. `file` and `mem` clients are built in; other
/// schemes are plugged in with [`FsRegistry::register_scheme`] or
/// [`FsRegistry::mount`].
pub struct FsRegistry {
    config: Arc<RemoteConfig>,
    factories: RwLock<HashMap<String, Arc<dyn FsFactory>>>,
    clients: RwLock<HashMap<FsKey, Arc<dyn RemoteFs>>>,
}

impl FsRegistry {
    pub fn new(config: Arc<RemoteConfig>) -> Self {
        let registry = Self {
            config,
            factories: RwLock::new(HashMap::new()),
            clients: RwLock::new(HashMap::new()),
        };
        registry.register_scheme("file", local_factory);
        registry.register_scheme("mem", memory_factory);
        registry
    }

    /// The shared configuration.
    pub fn config(&self) -> &Arc<RemoteConfig> {
        &self.config
    }

    /// Install (or replace) the factory for `scheme`.
    pub fn register_scheme(&self, scheme: &str, factory: impl FsFactory + 'static) {
        self.factories
            .write()
            .expect("registry lock poisoned")
            .insert(scheme.to_ascii_lowercase(), Arc::new(factory));
    }

    /// Pin a specific client instance for `scheme://authority`.
    pub fn mount(&self, scheme: &str, authority: Option<&str>, fs: Arc<dyn RemoteFs>) {
        let key = (scheme.to_ascii_lowercase(), authority.map(str::to_string));
        self.clients
            .write()
            .expect("registry lock poisoned")
            .insert(key, fs);
    }

    /// Fill in the default filesystem for scheme-less paths.
    pub fn qualify(&self, path: &RemotePath) -> RemotePath {
        if path.scheme().is_some() {
            return path.clone();
        }
        match self.config.default_fs().map(RemotePath::new) {
            Some(default) if default.scheme().is_some() => path.qualify(
                default.scheme().unwrap_or(FALLBACK_SCHEME),
                default.authority(),
            ),
            _ => path.qualify(FALLBACK_SCHEME, None),
        }
    }

    /// The client responsible for `path`.
    pub fn resolve(&self, path: &RemotePath) -> RemoteResult<Arc<dyn RemoteFs>> {
        let qualified = self.qualify(path);
        let scheme = qualified.scheme().unwrap_or(FALLBACK_SCHEME).to_string();
        let key: FsKey = (scheme, qualified.authority().map(str::to_string));

        if let Some(fs) = self
            .clients
            .read()
            .expect("registry lock poisoned")
            .get(&key)
        {
            return Ok(Arc::clone(fs));
        }

        let factory = self
            .factories
            .read()
            .expect("registry lock poisoned")
            .get(&key.0)
            .cloned()
            .ok_or_else(|| {
                RemoteError::runtime(
                    "UnsupportedFileSystemException",
                    format!("no filesystem for scheme \"{}\"", key.0),
                )
            })?;

        let mut clients = self.clients.write().expect("registry lock poisoned");
        // Another caller may have raced us here.
        if let Some(fs) = clients.get(&key) {
            return Ok(Arc::clone(fs));
        }
        let fs = factory.create(&key.0, key.1.as_deref(), &self.config)?;
        debug!(scheme = %key.0, authority = ?key.1, "remote filesystem client created");
        clients.insert(key, Arc::clone(&fs));
        Ok(fs)
    }

    /// The client for the configured default filesystem.
    pub fn default_fs(&self) -> RemoteResult<Arc<dyn RemoteFs>> {
        self.resolve(&RemotePath::new("/"))
    }
}

impl std::fmt::Debug for FsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clients = self.clients.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("FsRegistry")
            .field("config", &self.config.to_string())
            .field("client_count", &clients)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(config: RemoteConfig) -> FsRegistry {
        FsRegistry::new(Arc::new(config))
    }

    #[test]
    fn same_authority_shares_a_client() {
        let reg = registry(RemoteConfig::default());
        let a = reg.resolve(&RemotePath::new("mem://bucket/a")).unwrap();
        let b = reg.resolve(&RemotePath::new("mem://bucket/b/c")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let other = reg.resolve(&RemotePath::new("mem://other/a")).unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn schemeless_paths_use_default_fs() {
        let reg = registry(RemoteConfig::with_default_fs("mem://warehouse"));
        let q = reg.qualify(&RemotePath::new("/data/x"));
        assert_eq!(q.to_string(), "mem://warehouse/data/x");
        let a = reg.resolve(&RemotePath::new("/data/x")).unwrap();
        let b = reg.resolve(&RemotePath::new("mem://warehouse/")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn schemeless_paths_fall_back_to_local() {
        let reg = registry(RemoteConfig::default());
        assert_eq!(reg.qualify(&RemotePath::new("/tmp")).to_string(), "file:///tmp");
    }

    #[test]
    fn unknown_scheme_is_a_runtime_fault() {
        let reg = registry(RemoteConfig::default());
        let err = reg.resolve(&RemotePath::new("gopher://x/y")).err().unwrap();
        assert_eq!(err.type_name(), "UnsupportedFileSystemException");
    }

    #[test]
    fn mounted_client_wins() {
        let reg = registry(RemoteConfig::default());
        let fs = InMemoryFs::new("mem", Some("pinned"));
        fs.put("/x", &b"hello"[..]);
        reg.mount("mem", Some("pinned"), Arc::new(fs.clone()));
        let resolved = reg.resolve(&RemotePath::new("mem://pinned/x")).unwrap();
        assert!(resolved.exists(&RemotePath::new("mem://pinned/x")).unwrap());
    }

    #[test]
    fn custom_scheme_factory() {
        let reg = registry(RemoteConfig::default());
        reg.register_scheme("s3n", memory_factory);
        assert!(reg.resolve(&RemotePath::new("s3n://bucket/")).is_ok());
    }
}
