//! HTTP client for the question-answering backend.

use crate::wire;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url, multipart};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use uplink_core::backend::{
    BackendError, ChatBackend, ChatReply, Document, DocumentArchive, UploadReceipt,
};
use uplink_core::config::BackendConfig;

/// The only file extension the archive accepts.
const UPLOAD_EXTENSION: &str = "pdf";

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

/// reqwest-backed implementation of [`ChatBackend`] and [`DocumentArchive`].
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` if the URL cannot be parsed or cannot carry a path,
    /// `Transport` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            BackendError::InvalidRequest(format!("invalid base URL {base_url}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidRequest(format!(
                "base URL {base_url} cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::transport(format!("failed to build client: {e}"), false))?;

        Ok(Self { client, base_url })
    }

    /// Creates a client from the `[backend]` configuration section.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// The backend root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches the status banner served at the backend root.
    pub async fn ping(&self) -> Result<String, BackendError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .send()
            .await
            .map_err(map_transport_error)?;
        let body = read_success_body(response).await?;
        Ok(wire::decode_banner(&body)?)
    }

    /// Builds `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BackendError::InvalidRequest(format!(
                    "base URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn chat(&self, query: &str) -> Result<ChatReply, BackendError> {
        let url = self.endpoint(&["chat"])?;
        tracing::debug!(%url, "Sending chat query");

        let response = self
            .client
            .post(url)
            .json(&ChatRequest { query })
            .send()
            .await
            .map_err(map_transport_error)?;
        let body = read_success_body(response).await?;
        Ok(wire::decode_chat_reply(&body)?)
    }
}

#[async_trait]
impl DocumentArchive for BackendClient {
    async fn list_documents(&self) -> Result<Vec<Document>, BackendError> {
        let url = self.endpoint(&["documents"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let body = read_success_body(response).await?;
        Ok(wire::decode_documents(&body)?)
    }

    async fn delete_document(&self, name: &str) -> Result<(), BackendError> {
        if name.is_empty() {
            return Err(BackendError::InvalidRequest(
                "document name is empty".to_string(),
            ));
        }

        let url = self.endpoint(&["documents", name])?;
        tracing::debug!(%url, "Deleting document");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_success_body(response).await?;
        Ok(())
    }

    async fn upload_document(&self, path: &Path) -> Result<UploadReceipt, BackendError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(UPLOAD_EXTENSION));
        if !is_pdf {
            return Err(BackendError::InvalidRequest(format!(
                "only .pdf files can be uploaded: {}",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                BackendError::InvalidRequest(format!("{} has no file name", path.display()))
            })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            BackendError::InvalidRequest(format!("cannot read {}: {e}", path.display()))
        })?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime.essence_str())
            .map_err(|e| BackendError::InvalidRequest(format!("invalid MIME type: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        let url = self.endpoint(&["upload"])?;
        tracing::info!(file = %file_name, "Uploading document");

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        let body = read_success_body(response).await?;
        Ok(wire::decode_upload(&body)?)
    }
}

/// Returns the body of a 2xx response, or a `Status` error carrying the
/// backend's `detail`.
async fn read_success_body(response: Response) -> Result<Vec<u8>, BackendError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;

    if !status.is_success() {
        return Err(map_http_error(status, &body));
    }
    Ok(body.to_vec())
}

fn map_http_error(status: StatusCode, body: &[u8]) -> BackendError {
    let detail = wire::extract_detail(body);
    tracing::warn!(
        status = status.as_u16(),
        detail = detail.as_deref().unwrap_or(""),
        "Backend rejected request"
    );
    BackendError::Status {
        status: status.as_u16(),
        detail,
    }
}

fn map_transport_error(err: reqwest::Error) -> BackendError {
    BackendError::transport(
        format!("backend request failed: {err}"),
        err.is_connect() || err.is_timeout(),
    )
}
