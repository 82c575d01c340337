//! Configuration service implementation.
//!
//! Loads the client configuration from `config.toml` and caches it.

use crate::paths::UplinkPaths;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use uplink_core::config::ClientConfig;
use uplink_core::error::{Result, UplinkError};

/// Configuration service that loads and caches the client configuration.
///
/// A missing file yields defaults. A malformed file is reported as
/// [`UplinkError::Config`] rather than silently replaced.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    /// Creates a service reading from an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading from the platform config file.
    pub fn from_default_location() -> Result<Self> {
        let path = UplinkPaths::config_file().map_err(|e| UplinkError::config(e.to_string()))?;
        Ok(Self::new(path))
    }

    /// The file this service reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<ClientConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = Self::load_config(&self.path)?;

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    fn load_config(path: &Path) -> Result<ClientConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(ClientConfig::default());
            }
            Err(e) => {
                return Err(UplinkError::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        toml::from_str(&content)
            .map_err(|e| UplinkError::config(format!("Invalid {}: {}", path.display(), e)))
    }
}
