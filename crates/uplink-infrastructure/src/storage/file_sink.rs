//! File-backed persistence sink.
//!
//! Each key maps to `{dir}/{sanitized_key}.json`. Writes go through
//! [`AtomicFile`], so a crash mid-write leaves the previous value intact.

use super::atomic_file::AtomicFile;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uplink_core::error::{Result, UplinkError};
use uplink_core::session::PersistenceSink;

/// Persistence sink storing one file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates a sink rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the stored files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Maps a key onto a safe file stem.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl PersistenceSink for FileSink {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let file = AtomicFile::new(self.path_for(key));
        tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| UplinkError::internal(format!("Failed to join task: {}", e)))?
            .map_err(|e| UplinkError::persistence(format!("Failed to read {}: {}", key, e)))
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let file = AtomicFile::new(self.path_for(key));
        let bytes = value.to_vec();
        tokio::task::spawn_blocking(move || file.save(&bytes))
            .await
            .map_err(|e| UplinkError::internal(format!("Failed to join task: {}", e)))?
            .map_err(|e| UplinkError::persistence(format!("Failed to write {}: {}", key, e)))?;

        tracing::trace!(key, bytes = value.len(), "Persisted value");
        Ok(())
    }
}
