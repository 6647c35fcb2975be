//! Decoder for the remote store's response envelope.
//!
//! Responses look like `{ "success": bool, "data": ... }`, optionally wrapped
//! in a callback such as `undefined({...})` or `cb_17({...});`. The wrapper
//! name is never assumed: the body is the outermost `{...}` pair, or failing
//! that the outermost `(...)` pair, or the whole trimmed text.

use serde::Deserialize;
use thiserror::Error;

use super::{Record, RecordSet};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response is not utf-8")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("response is empty")]
    NoPayload,

    #[error("response is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote store rejected the request: {0}")]
    Rejected(String),

    #[error("response data is not a record set")]
    NotTabular,
}

#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Locates the JSON body inside an optional callback wrapper.
fn unwrap_callback(text: &str) -> &str {
    let text = text.trim();
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            return &text[start..=end];
        }
    }
    if let (Some(start), Some(end)) = (text.find('('), text.rfind(')')) {
        if end > start {
            return text[start + 1..end].trim();
        }
    }
    text
}

/// Parses the envelope and checks `success`.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    let body = unwrap_callback(text);
    if body.is_empty() {
        return Err(DecodeError::NoPayload);
    }
    let envelope: Envelope = serde_json::from_str(body)?;
    if !envelope.success {
        let reason = envelope
            .data
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("success flag not set")
            .to_string();
        return Err(DecodeError::Rejected(reason));
    }
    Ok(envelope)
}

/// Decodes a `read` response into its rows. Non-object rows are skipped.
pub fn decode(bytes: &[u8]) -> Result<RecordSet, DecodeError> {
    match decode_envelope(bytes)?.data {
        serde_json::Value::Array(rows) => Ok(rows
            .into_iter()
            .filter_map(|row| match row {
                serde_json::Value::Object(record) => Some(record),
                _ => None,
            })
            .collect::<Vec<Record>>()),
        _ => Err(DecodeError::NotTabular),
    }
}
