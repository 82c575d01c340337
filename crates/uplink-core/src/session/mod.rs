//! Session domain module.
//!
//! This module contains the chat session model, the persistence sink
//! interface, and the store that manages the session collection.
//!
//! # Module Structure
//!
//! - `model`: Session entity and persisted layout (`ChatSession`)
//! - `message`: Message types (`Message`, `Sender`)
//! - `sink`: Persistence interface (`PersistenceSink`)
//! - `policy`: Send policy and store lifecycle
//! - `store`: Session collection management (`SessionStore`)
//!
//! # Usage
//!
//! ```ignore
//! use uplink_core::session::{SessionStore, PersistenceSink, SendOutcome};
//!
//! let store = SessionStore::new(sink, backend);
//! store.initialize().await;
//! let id = store.active_session_id().await;
//! store.send_message(&id, "Launch window for PSLV-C57?").await?;
//! ```

mod clock;
mod message;
mod model;
mod policy;
mod sink;
mod store;

// Re-export public API
pub use clock::{Clock, SystemClock};
pub use message::{Message, Sender};
pub use model::{
    ChatSession, DEFAULT_SESSION_GREETING, DEFAULT_SESSION_ID, DEFAULT_SESSION_TIMESTAMP,
    DEFAULT_SESSION_TITLE, NEW_SESSION_GREETING, NEW_SESSION_TITLE, TITLE_MAX_CHARS,
    decode_sessions, derive_title, encode_sessions,
};
pub use policy::{SendPolicy, StoreLifecycle};
pub use sink::{PersistenceSink, SESSIONS_KEY};
pub use store::{FAILURE_NOTICE, SendOutcome, SessionStore};
