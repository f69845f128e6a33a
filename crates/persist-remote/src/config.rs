use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Property naming the default filesystem.
pub const DEFAULT_FS_KEY: &str = "fs.defaultFS";

/// Legacy spelling of [`DEFAULT_FS_KEY`] still read by older clients.
pub const LEGACY_DEFAULT_FS_KEY: &str = "fs.default.name";

/// Process-wide remote filesystem configuration.
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// component that resolves remote paths. Nothing mutates it afterwards.
///
/// On disk it is a TOML document:
///
/// ```toml
/// default_fs = "hdfs://namenode:8020"
/// home_dir = "/user/ops"
///
/// [properties]
/// "dfs.replication" = "2"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Default filesystem URI for scheme-less paths.
    pub default_fs: Option<String>,
    /// Home directory override reported by clients.
    pub home_dir: Option<String>,
    /// Free-form client properties.
    pub properties: BTreeMap<String, String>,
    /// Files this configuration was read from.
    #[serde(skip)]
    pub resources: Vec<PathBuf>,
}

impl RemoteConfig {
    /// Configuration pointing scheme-less paths at `endpoint`.
    ///
    /// Both the current and the legacy default-filesystem properties are set
    /// so older clients pick the endpoint up too.
    pub fn with_default_fs(endpoint: &str) -> Self {
        let mut config = Self::default();
        if !endpoint.is_empty() {
            config.default_fs = Some(endpoint.to_string());
            config
                .properties
                .insert(DEFAULT_FS_KEY.to_string(), endpoint.to_string());
            config
                .properties
                .insert(LEGACY_DEFAULT_FS_KEY.to_string(), endpoint.to_string());
        }
        config
    }

    /// Read a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.resources.push(path.to_path_buf());
        debug!(resource = %path.display(), "resource added to the remote configuration");
        Ok(config)
    }

    /// Startup entry point: a configuration file wins over a default
    /// endpoint; with neither, an empty configuration is returned.
    pub fn load(config_file: Option<&Path>, default_fs: Option<&str>) -> Result<Self, ConfigError> {
        match (config_file, default_fs) {
            (Some(path), _) => Self::from_file(path),
            (None, Some(endpoint)) => Ok(Self::with_default_fs(endpoint)),
            (None, None) => Ok(Self::default()),
        }
    }

    /// The effective default filesystem URI.
    pub fn default_fs(&self) -> Option<&str> {
        self.default_fs
            .as_deref()
            .or_else(|| self.get(DEFAULT_FS_KEY))
            .or_else(|| self.get(LEGACY_DEFAULT_FS_KEY))
            .filter(|s| !s.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl fmt::Display for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration: ")?;
        if self.resources.is_empty() {
            write!(f, "<defaults>")?;
        } else {
            let names: Vec<String> = self
                .resources
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            write!(f, "{}", names.join(", "))?;
        }
        if let Some(fs) = self.default_fs() {
            write!(f, "; default_fs={fs}")?;
        }
        for (k, v) in &self.properties {
            write!(f, "; {k}={v}")?;
        }
        Ok(())
    }
}
