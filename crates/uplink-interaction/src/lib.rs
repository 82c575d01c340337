//! HTTP implementation of the backend contract.

pub mod client;
pub mod wire;

pub use client::BackendClient;
