//! Validated decoding of backend response bodies.
//!
//! Each body is parsed into a permissive shape first and then checked for
//! the fields the client relies on, so a missing field surfaces as
//! [`DecodeError::MissingField`] instead of a generic JSON error.

use serde::Deserialize;
use serde_json::Value;
use uplink_core::backend::{ChatReply, DecodeError, Document, UploadReceipt};

#[derive(Deserialize)]
struct ChatBody {
    response: Option<String>,
    #[serde(default)]
    sources: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct DocumentsBody {
    documents: Option<Vec<DocumentBody>>,
}

#[derive(Deserialize)]
struct DocumentBody {
    name: Option<String>,
    size: Option<String>,
    date: Option<String>,
    #[serde(default)]
    pages: Option<u32>,
}

#[derive(Deserialize)]
struct UploadBody {
    filename: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct RootBody {
    message: Option<String>,
}

fn parse<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(body).map_err(|e| DecodeError::InvalidJson(e.to_string()))
}

/// Decodes a `/chat` answer. `sources` is optional; `response` is not.
pub fn decode_chat_reply(body: &[u8]) -> Result<ChatReply, DecodeError> {
    let parsed: ChatBody = parse(body)?;
    let response = parsed
        .response
        .ok_or(DecodeError::MissingField("response"))?;
    Ok(ChatReply {
        response,
        sources: parsed.sources,
    })
}

/// Decodes a `/documents` listing.
pub fn decode_documents(body: &[u8]) -> Result<Vec<Document>, DecodeError> {
    let parsed: DocumentsBody = parse(body)?;
    parsed
        .documents
        .ok_or(DecodeError::MissingField("documents"))?
        .into_iter()
        .map(|doc| {
            Ok(Document {
                name: doc.name.ok_or(DecodeError::MissingField("name"))?,
                size: doc.size.ok_or(DecodeError::MissingField("size"))?,
                date: doc.date.ok_or(DecodeError::MissingField("date"))?,
                pages: doc.pages,
            })
        })
        .collect()
}

/// Decodes an `/upload` acknowledgement.
pub fn decode_upload(body: &[u8]) -> Result<UploadReceipt, DecodeError> {
    let parsed: UploadBody = parse(body)?;
    Ok(UploadReceipt {
        filename: parsed
            .filename
            .ok_or(DecodeError::MissingField("filename"))?,
        status: parsed.status,
    })
}

/// Decodes the banner served at the backend root.
pub fn decode_banner(body: &[u8]) -> Result<String, DecodeError> {
    let parsed: RootBody = parse(body)?;
    parsed.message.ok_or(DecodeError::MissingField("message"))
}

/// Pulls the `detail` field out of an error body, if there is one.
///
/// Non-string details (validation error lists) are rendered as JSON.
pub fn extract_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}
