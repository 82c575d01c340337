//! Unified path management for uplink configuration and data files.
//!
//! Paths are resolved through the `dirs` crate so each platform gets its
//! conventional location.

use std::path::PathBuf;

/// Name of the per-user application directory.
const APP_DIR: &str = "uplink";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for uplink.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/uplink/            # Config directory
/// ├── config.toml              # Client configuration
/// └── logs/                    # Application logs
///     └── uplink.log.YYYY-MM-DD
///
/// ~/.local/share/uplink/       # Data directory
/// └── sessions/                # Persisted chat sessions
///     └── isro_chat_sessions.json
/// ```
pub struct UplinkPaths;

impl UplinkPaths {
    /// Returns the uplink configuration directory (e.g., `~/.config/uplink/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the uplink data directory (e.g., `~/.local/share/uplink/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding persisted sessions.
    ///
    /// A configured `data_dir` replaces the platform data directory.
    pub fn sessions_dir(data_dir: Option<&PathBuf>) -> Result<PathBuf, PathError> {
        let base = match data_dir {
            Some(dir) => dir.clone(),
            None => Self::data_dir()?,
        };
        Ok(base.join("sessions"))
    }

    /// Returns the logs directory.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
