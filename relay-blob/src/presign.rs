use std::sync::Arc;
use tracing::debug;

use crate::{
    validate, BlobConfig, BlobKeyStrategy, BlobResult, DefaultKeyStrategy, PresignedTarget,
    PresignedUpload, SignedUrlBlobStore, UploadId, UploadIntent,
};

/// Issues time-limited upload URLs. Holds no state beyond its collaborators.
#[derive(Clone)]
pub struct PresignService {
    store: Arc<dyn SignedUrlBlobStore>,
    keys: Arc<dyn BlobKeyStrategy>,
    config: BlobConfig,
}

impl PresignService {
    /// Create a presign service using the default key strategy
    pub fn new<S: SignedUrlBlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        let keys = DefaultKeyStrategy::new(config.key_prefix.clone());
        Self::from_parts(Arc::new(store), Arc::new(keys), config)
    }

    /// Create from shared collaborators
    pub fn from_parts(
        store: Arc<dyn SignedUrlBlobStore>,
        keys: Arc<dyn BlobKeyStrategy>,
        config: BlobConfig,
    ) -> Self {
        Self {
            store,
            keys,
            config,
        }
    }

    /// Sign a single-shot whole-object PUT under a freshly generated key
    pub async fn sign_upload(&self, filename: &str, content_type: &str) -> BlobResult<PresignedUpload> {
        validate::check(&UploadIntent::new(filename, content_type))?;

        let key = self.keys.object_key(filename);
        let expires_at = self.expires_at();
        let url = self
            .store
            .sign_put(&key, content_type, self.config.presign_expiry())
            .await?;
        debug!(%key, "signed single-shot upload");

        let target = PresignedTarget::put(url, expires_at);
        Ok(PresignedUpload {
            key,
            url: target.url,
            method: target.method,
            expires_at: target.expires_at,
        })
    }

    /// Sign a PUT for one part. The part number must already be validated.
    pub async fn sign_part(
        &self,
        upload_id: &UploadId,
        key: &str,
        part_number: u32,
    ) -> BlobResult<PresignedTarget> {
        let expires_at = self.expires_at();
        let url = self
            .store
            .sign_upload_part(upload_id, key, part_number, self.config.presign_expiry())
            .await?;
        debug!(%upload_id, key, part_number, "signed part upload");

        Ok(PresignedTarget::put(url, expires_at))
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    /// Read before the store signs
    fn expires_at(&self) -> i64 {
        chrono::Utc::now().timestamp() + self.config.presign_expiry().as_secs() as i64
    }
}
