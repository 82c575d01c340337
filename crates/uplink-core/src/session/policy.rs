//! Policies and lifecycle states of the session store.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the store treats a send while another request for the same session
/// is still in flight.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SendPolicy {
    /// Every send proceeds; replies append in completion order.
    #[default]
    Concurrent,
    /// A send for a session with a pending request is rejected.
    SingleFlight,
}

/// Initialization lifecycle of the session store.
///
/// Nothing is written to the sink before the store has read it, so valid
/// storage is never overwritten by the built-in seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StoreLifecycle {
    /// Holding the built-in seed; storage not read yet.
    Uninitialized,
    /// Reading storage failed; persistence stays off until a retry succeeds.
    Degraded,
    /// Storage has been read; persistence enabled.
    Loaded,
    /// Storage mirrors the in-memory collection.
    Ready,
}

impl StoreLifecycle {
    /// Whether mutations are written through to the sink.
    pub fn persists(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Degraded)
    }
}
