//! Persistence sink trait.
//!
//! Defines the key-value byte storage the session store writes through.

use crate::error::Result;
use async_trait::async_trait;

/// Key under which the session collection is stored.
pub const SESSIONS_KEY: &str = "isro_chat_sessions";

/// An abstract key-value byte store used as the session persistence target.
///
/// This trait decouples the session store from the storage mechanism
/// (files on disk, memory, a remote service).
///
/// # Implementation Notes
///
/// Implementations should make `write` replace the previous value as a whole:
/// a reader must observe either the old or the new bytes, never a mix.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: A value is stored
    /// - `Ok(None)`: Nothing stored under the key
    /// - `Err(_)`: The sink could not be read
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrites the value stored under `key`.
    async fn write(&self, key: &str, value: &[u8]) -> Result<()>;
}
