//! In-memory persistence sink.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uplink_core::error::Result;
use uplink_core::session::PersistenceSink;

/// Persistence sink that keeps values in a map for the life of the process.
///
/// Used by `--ephemeral` runs and in tests that need a real sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink pre-populated with a single entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.into(), value.into());
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns a copy of the stored value for `key`.
    pub async fn snapshot(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().await.get(key).cloned()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
