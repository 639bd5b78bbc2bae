use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{BlobError, BlobResult};

/// User metadata attached to an object at session creation
pub type ObjectMetadata = BTreeMap<String, String>;

/// Store-issued identifier of a multipart upload session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(pub String);

impl UploadId {
    /// Create from the identifier the store returned
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UploadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open multipart upload.
///
/// Nothing here is cached by the coordinator; it is returned to the caller,
/// who presents `upload_id` and `key` on every later request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub upload_id: UploadId,
    pub key: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMetadata>,
}

/// One part as reported by the store's listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartDescriptor {
    pub part_number: u32,
    #[serde(rename = "ETag", skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
}

impl PartDescriptor {
    pub fn new(part_number: u32) -> Self {
        Self {
            part_number,
            etag: None,
            size: None,
            last_modified: None,
        }
    }

    pub fn with_etag<S: Into<String>>(mut self, etag: S) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_last_modified(mut self, secs: i64) -> Self {
        self.last_modified = Some(secs);
        self
    }

    /// The ETag, if the store has one and it is not blank
    pub fn completed_etag(&self) -> Option<&str> {
        self.etag.as_deref().filter(|etag| !etag.trim().is_empty())
    }
}

/// A part the client claims to have uploaded. Only the number is taken;
/// any ETag the client sends is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClaimedPart {
    pub part_number: u32,
}

impl ClaimedPart {
    pub fn new(part_number: u32) -> Self {
        Self { part_number }
    }

    /// Parse the client's `parts` value.
    ///
    /// Accepts `[{"PartNumber": 1, ...}, ...]` (extra fields ignored) or a
    /// bare `[1, 2, ...]`. Anything that is not a sequence of part numbers is a
    /// validation error.
    pub fn parse_list(value: &Value) -> BlobResult<Vec<ClaimedPart>> {
        let items = value.as_array().ok_or_else(|| {
            BlobError::validation(
                "parts must be an array of part numbers to complete the multipart upload.",
            )
        })?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let number = match item {
                    Value::Object(fields) => fields
                        .get("PartNumber")
                        .or_else(|| fields.get("partNumber")),
                    other => Some(other),
                };
                number
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .map(ClaimedPart::new)
                    .ok_or_else(|| {
                        BlobError::validation(format!(
                            "parts[{}] must carry an integer PartNumber.",
                            index
                        ))
                    })
            })
            .collect()
    }
}

/// One page of a part listing
#[derive(Debug, Clone, Default)]
pub struct PartsPage {
    pub parts: Vec<PartDescriptor>,
    pub is_truncated: bool,
    pub next_part_number_marker: Option<String>,
}

/// A signed, time-limited upload target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedTarget {
    pub url: String,
    pub method: String,
    /// Unix seconds after which the URL is rejected by the store
    pub expires_at: i64,
}

impl PresignedTarget {
    pub fn put<S: Into<String>>(url: S, expires_at: i64) -> Self {
        Self {
            url: url.into(),
            method: "PUT".to_string(),
            expires_at,
        }
    }
}
