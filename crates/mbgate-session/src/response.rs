use std::borrow::Cow;

use bytes::Bytes;
use mbgate_register::{decode, BaseType, Value, WordOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// `status` value of a successful device response.
pub const STATUS_OK: &str = "ok";
/// `status` value of a failed device response.
pub const STATUS_ERROR: &str = "error";

/// A structured device reply: a JSON object with a `status` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every other top-level field, untouched.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl DeviceResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            error: None,
            fields: serde_json::Map::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            error: Some(message.into()),
            fields: serde_json::Map::new(),
        }
    }

    /// Attach a top-level field.
    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Register words carried under `register.words`, if any.
    pub fn words(&self) -> Option<Vec<u16>> {
        let words = self.fields.get("register")?.get("words")?.as_array()?;
        words
            .iter()
            .map(|word| word.as_u64().and_then(|w| u16::try_from(w).ok()))
            .collect()
    }

    /// Decode the carried register words as a typed value.
    ///
    /// A response without words fails with a length mismatch.
    pub fn decode_register(&self, base_type: BaseType, word_order: WordOrder) -> Result<Value> {
        let words = self.words().unwrap_or_default();
        Ok(decode(&words, base_type, word_order)?)
    }
}

/// Reply bytes that did not parse as a [`DeviceResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub data: Bytes,
}

impl RawResponse {
    /// Reply as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Outcome of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Parsed(DeviceResponse),
    Raw(RawResponse),
}

impl Response {
    pub fn parsed(&self) -> Option<&DeviceResponse> {
        match self {
            Response::Parsed(response) => Some(response),
            Response::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Response::Raw(_))
    }
}

/// Interpret reassembled reply bytes.
///
/// Never fails: anything other than a JSON object with a string `status`
/// comes back as [`Response::Raw`].
pub fn parse_response(data: Bytes) -> Response {
    match serde_json::from_slice::<serde_json::Value>(&data) {
        Ok(value) if value.get("status").is_some_and(serde_json::Value::is_string) => {
            match serde_json::from_value::<DeviceResponse>(value) {
                Ok(response) => {
                    debug!(status = %response.status, "parsed device response");
                    return Response::Parsed(response);
                }
                Err(err) => warn!(error = %err, "device response has unexpected shape"),
            }
        }
        Ok(_) => debug!(size = data.len(), "response has no status field"),
        Err(err) => warn!(size = data.len(), error = %err, "response is not JSON"),
    }
    Response::Raw(RawResponse { data })
}
