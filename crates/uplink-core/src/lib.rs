//! Domain layer of the Uplink client.
//!
//! Holds the chat session model and store, the backend contract, the client
//! configuration model, and the shared error type.

pub mod backend;
pub mod config;
pub mod error;
pub mod session;

// Re-export common error type
pub use error::UplinkError;
