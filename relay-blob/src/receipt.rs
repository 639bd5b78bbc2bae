use serde::{Deserialize, Serialize};

use crate::UploadId;

/// Receipt returned after a multipart upload has been finalized
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub upload_id: UploadId,
    pub key: String,
    /// Location reported by the store, when it reports one
    pub location: Option<String>,
    /// Number of parts the object was assembled from
    pub parts: u32,
    pub completed_at: i64,
}

impl UploadReceipt {
    pub fn new(upload_id: UploadId, key: String, parts: u32) -> Self {
        Self {
            upload_id,
            key,
            location: None,
            parts,
            completed_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Set location
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }
}

/// A signed single-shot upload together with the key it was signed for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub key: String,
    pub url: String,
    pub method: String,
    pub expires_at: i64,
}
