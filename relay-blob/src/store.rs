use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::{BlobResult, ObjectMetadata, PartDescriptor, PartsPage, UploadId};

/// Multipart primitives of the remote object store.
///
/// Every call may fail; failures are reported as `BlobError::Store` and are
/// never retried by callers in this crate.
#[async_trait]
pub trait MultipartBlobStore: Send + Sync {
    /// Open a multipart session for `key`
    async fn create_multipart(
        &self,
        key: &str,
        content_type: &str,
        metadata: Option<&ObjectMetadata>,
    ) -> BlobResult<UploadId>;

    /// Fetch one page of the session's parts, starting after `marker`
    async fn list_parts_page(
        &self,
        upload_id: &UploadId,
        key: &str,
        marker: Option<&str>,
    ) -> BlobResult<PartsPage>;

    /// Assemble the object from `parts` (ascending, each with an ETag).
    /// Returns the store-assigned location.
    async fn complete_multipart(
        &self,
        upload_id: &UploadId,
        key: &str,
        parts: &[PartDescriptor],
    ) -> BlobResult<Option<String>>;

    /// Release the session and every uploaded-but-unfinalized part
    async fn abort_multipart(&self, upload_id: &UploadId, key: &str) -> BlobResult<()>;
}

/// Presigning capability of the remote object store
#[async_trait]
pub trait SignedUrlBlobStore: Send + Sync {
    /// Sign a whole-object PUT
    async fn sign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> BlobResult<String>;

    /// Sign a PUT for one part of a multipart session. The signature covers
    /// an empty body; the client streams the bytes to the store itself.
    async fn sign_upload_part(
        &self,
        upload_id: &UploadId,
        key: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> BlobResult<String>;
}

/// Strategy for generating object keys
pub trait BlobKeyStrategy: Send + Sync {
    /// Generate a fresh, never reused key for `filename`
    fn object_key(&self, filename: &str) -> String;
}

/// Default key strategy: `{prefix}/{uuid-v4}-{filename}`
#[derive(Debug, Clone)]
pub struct DefaultKeyStrategy {
    prefix: String,
}

impl DefaultKeyStrategy {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for DefaultKeyStrategy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_KEY_PREFIX)
    }
}

impl BlobKeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, filename: &str) -> String {
        let prefix = self.prefix.trim_end_matches('/');
        if prefix.is_empty() {
            format!("{}-{}", Uuid::new_v4(), filename)
        } else {
            format!("{}/{}-{}", prefix, Uuid::new_v4(), filename)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_namespaced_and_keep_the_filename() {
        let keys = DefaultKeyStrategy::new("uploads");
        let key = keys.object_key("clip.mp4");

        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-clip.mp4"));

        let id = &key["uploads/".len()..key.len() - "-clip.mp4".len()];
        assert!(Uuid::parse_str(id).is_ok(), "not a uuid: {id}");
    }

    #[test]
    fn trailing_slash_in_prefix_is_not_doubled() {
        let key = DefaultKeyStrategy::new("media/").object_key("a.txt");
        assert!(key.starts_with("media/"));
        assert!(!key.starts_with("media//"));
    }

    #[test]
    fn same_filename_never_repeats_a_key() {
        let keys = DefaultKeyStrategy::default();
        let generated: HashSet<String> = (0..1000).map(|_| keys.object_key("same.bin")).collect();
        assert_eq!(generated.len(), 1000);
    }
}
