//! Document archive use case.
//!
//! Keeps a cached copy of the backend's document list and turns archive
//! operations into the status lines shown to the user.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uplink_core::backend::{BackendError, Document, DocumentArchive};

/// Outcome of an upload, rendered as a one-line status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// The backend stored and ingested the file.
    Success { filename: String },
    /// The upload was refused, by the backend or before sending.
    Rejected { detail: String },
    /// The backend could not be reached or answered unintelligibly.
    Failed,
}

impl UploadStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { filename } => write!(f, "Success: {filename} ingested!"),
            Self::Rejected { detail } => write!(f, "Error: {detail}"),
            Self::Failed => write!(f, "Upload Failed! Check Backend."),
        }
    }
}

#[derive(Debug, Default)]
struct ArchiveState {
    documents: Vec<Document>,
    loading: bool,
}

/// Cached view over a [`DocumentArchive`].
pub struct DocumentArchiveService {
    archive: Arc<dyn DocumentArchive>,
    state: RwLock<ArchiveState>,
}

impl DocumentArchiveService {
    /// Creates a service with an empty cache. Call [`refresh`](Self::refresh)
    /// to populate it.
    pub fn new(archive: Arc<dyn DocumentArchive>) -> Self {
        Self {
            archive,
            state: RwLock::new(ArchiveState::default()),
        }
    }

    /// Re-fetches the document list.
    ///
    /// On failure the previous list is kept and the error is logged.
    /// Returns whether the cache was updated.
    pub async fn refresh(&self) -> bool {
        self.state.write().await.loading = true;

        let result = self.archive.list_documents().await;

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(documents) => {
                tracing::debug!(count = documents.len(), "Fetched document list");
                state.documents = documents;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch documents");
                false
            }
        }
    }

    /// The cached documents, in backend order.
    pub async fn documents(&self) -> Vec<Document> {
        self.state.read().await.documents.clone()
    }

    /// Whether a refresh is in progress.
    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Cached documents whose name contains `query`, ignoring case.
    pub async fn filtered(&self, query: &str) -> Vec<Document> {
        let needle = query.to_lowercase();
        self.state
            .read()
            .await
            .documents
            .iter()
            .filter(|doc| doc.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Deletes a document and re-fetches the list on success.
    ///
    /// Failures are logged and leave the cache unchanged. Returns whether
    /// the backend deleted the document.
    pub async fn delete(&self, name: &str) -> bool {
        match self.archive.delete_document(name).await {
            Ok(()) => {
                tracing::info!(document = name, "Deleted document");
                self.refresh().await;
                true
            }
            Err(e) => {
                tracing::error!(document = name, error = %e, "Failed to delete document");
                false
            }
        }
    }

    /// Uploads a PDF and re-fetches the list on success.
    pub async fn upload(&self, path: &Path) -> UploadStatus {
        match self.archive.upload_document(path).await {
            Ok(receipt) => {
                tracing::info!(
                    filename = %receipt.filename,
                    status = receipt.status.as_deref().unwrap_or(""),
                    "Uploaded document"
                );
                self.refresh().await;
                UploadStatus::Success {
                    filename: receipt.filename,
                }
            }
            Err(BackendError::Status {
                status,
                detail: Some(detail),
            }) => {
                tracing::warn!(status, "Upload rejected");
                UploadStatus::Rejected { detail }
            }
            Err(BackendError::InvalidRequest(message)) => {
                UploadStatus::Rejected { detail: message }
            }
            Err(e) => {
                tracing::error!(error = %e, "Upload failed");
                UploadStatus::Failed
            }
        }
    }
}
