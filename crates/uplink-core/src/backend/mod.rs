//! Backend contract.
//!
//! The client talks to an external question-answering service. These traits
//! are the seam between the domain and the HTTP implementation in
//! `uplink-interaction`, and let tests substitute scripted backends.

mod error;

pub use error::{BackendError, DecodeError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A decoded answer from the `/chat` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// Answer text (Markdown)
    pub response: String,
    /// Names of the documents the answer was drawn from
    pub sources: Option<Vec<String>>,
}

impl ChatReply {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            sources: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }
}

/// One archived PDF as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name, also the key used for deletion
    pub name: String,
    /// Human-readable size, e.g. `"2.4 MB"`
    pub size: String,
    /// Mission date label
    pub date: String,
    /// Page count, when the backend could determine it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// Acknowledgement of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Name the backend stored the file under
    pub filename: String,
    /// Ingestion status message, if the backend sent one
    pub status: Option<String>,
}

/// Sends chat queries to the backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Posts `query` and returns the decoded answer.
    async fn chat(&self, query: &str) -> Result<ChatReply, BackendError>;
}

/// Manages the backend's document archive.
#[async_trait]
pub trait DocumentArchive: Send + Sync {
    /// Lists archived documents.
    async fn list_documents(&self) -> Result<Vec<Document>, BackendError>;

    /// Deletes the document stored under `name`.
    async fn delete_document(&self, name: &str) -> Result<(), BackendError>;

    /// Uploads the PDF at `path` for ingestion.
    async fn upload_document(&self, path: &Path) -> Result<UploadReceipt, BackendError>;
}
