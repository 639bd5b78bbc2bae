use async_trait::async_trait;
use serde_json::Value;
use validator::Validate;

use crate::{
    BlobResult, ClaimedPart, PartDescriptor, PresignedTarget, UploadId, UploadReceipt,
    UploadSession,
};

/// Coordinates multipart uploads against a remote store.
///
/// Implementations hold no per-session state: the store is the only record
/// of which sessions and parts exist.
#[async_trait]
pub trait UploadCoordinator: Send + Sync {
    /// Open a new multipart session
    async fn open_session(&self, intent: UploadIntent) -> BlobResult<UploadSession>;

    /// Presign the upload of one part. `part_number` is taken unchecked from
    /// the caller and validated before the store is contacted.
    async fn part_upload_target(
        &self,
        upload_id: &UploadId,
        key: &str,
        part_number: i64,
    ) -> BlobResult<PresignedTarget>;

    /// Every part the store knows about, ascending by part number
    async fn list_parts(
        &self,
        upload_id: &UploadId,
        key: &str,
    ) -> BlobResult<Vec<PartDescriptor>>;

    /// Reconcile the claim against the store's listing and finalize
    async fn complete(
        &self,
        upload_id: &UploadId,
        key: &str,
        claimed: &[ClaimedPart],
    ) -> BlobResult<UploadReceipt>;

    /// Release the session at the store
    async fn abort(&self, upload_id: &UploadId, key: &str) -> BlobResult<()>;
}

/// Intent to open a multipart upload
#[derive(Debug, Clone, Validate)]
pub struct UploadIntent {
    #[validate(length(min = 1, message = "filename is required"))]
    pub filename: String,
    #[validate(length(min = 1, message = "contentType is required"))]
    pub content_type: String,
    /// `Null` when absent; otherwise must be an object of string values
    #[validate(custom(function = "crate::validate::metadata_shape"))]
    pub metadata: Value,
}

impl UploadIntent {
    pub fn new<F: Into<String>, C: Into<String>>(filename: F, content_type: C) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_metadata_entry<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        if self.metadata.is_null() {
            self.metadata = Value::Object(serde_json::Map::new());
        }
        if let Some(obj) = self.metadata.as_object_mut() {
            obj.insert(key.into(), Value::String(value.into()));
        }
        self
    }
}
