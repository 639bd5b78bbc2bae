use std::sync::Arc;
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::validate::{self, SessionRef};
use crate::{
    BlobConfig, BlobError, BlobKeyStrategy, BlobResult, ClaimedPart, DefaultKeyStrategy,
    MultipartBlobStore, PartDescriptor, PresignService, PresignedTarget, SignedUrlBlobStore,
    UploadCoordinator, UploadId, UploadIntent, UploadReceipt, UploadSession, MAX_PART_NUMBER,
};

/// Default upload coordinator backed directly by the remote store.
///
/// Every operation is a stateless round trip: session and part existence are
/// whatever the store reports. Nothing is retried.
pub struct DefaultUploadCoordinator {
    store: Arc<dyn MultipartBlobStore>,
    presign: PresignService,
    keys: Arc<dyn BlobKeyStrategy>,
    config: BlobConfig,
}

impl DefaultUploadCoordinator {
    /// Create a coordinator using the default key strategy
    pub fn new<S>(store: S, config: BlobConfig) -> Self
    where
        S: MultipartBlobStore + SignedUrlBlobStore + 'static,
    {
        let keys = DefaultKeyStrategy::new(config.key_prefix.clone());
        Self::with_key_strategy(store, keys, config)
    }

    /// Create with custom key strategy
    pub fn with_key_strategy<S, K>(store: S, keys: K, config: BlobConfig) -> Self
    where
        S: MultipartBlobStore + SignedUrlBlobStore + 'static,
        K: BlobKeyStrategy + 'static,
    {
        Self::from_shared(Arc::new(store), Arc::new(keys), config)
    }

    /// Create from a store shared with other components
    pub fn from_shared<S>(store: Arc<S>, keys: Arc<dyn BlobKeyStrategy>, config: BlobConfig) -> Self
    where
        S: MultipartBlobStore + SignedUrlBlobStore + 'static,
    {
        let presign = PresignService::from_parts(store.clone(), Arc::clone(&keys), config.clone());
        Self {
            store,
            presign,
            keys,
            config,
        }
    }

    /// The presign service sharing this coordinator's store and keys
    pub fn presign(&self) -> &PresignService {
        &self.presign
    }

    /// Get configuration
    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    fn session_ref<'a>(upload_id: &UploadId, key: &'a str) -> BlobResult<&'a str> {
        validate::check(&SessionRef::new(upload_id.as_str(), key))?;
        Ok(key)
    }
}

/// Positional comparison of part numbers. Lengths must agree too.
fn parts_reconcile(authoritative: &[PartDescriptor], claimed: &[ClaimedPart]) -> bool {
    authoritative.len() == claimed.len()
        && authoritative
            .iter()
            .zip(claimed)
            .all(|(stored, claim)| stored.part_number == claim.part_number)
}

#[async_trait]
impl UploadCoordinator for DefaultUploadCoordinator {
    #[instrument(skip(self, intent), fields(filename = %intent.filename))]
    async fn open_session(&self, intent: UploadIntent) -> BlobResult<UploadSession> {
        validate::check(&intent)?;
        let metadata = validate::metadata_map(&intent.metadata);

        let key = self.keys.object_key(&intent.filename);
        let upload_id = self
            .store
            .create_multipart(&key, &intent.content_type, metadata.as_ref())
            .await?;

        info!(%upload_id, %key, "multipart upload opened");

        Ok(UploadSession {
            upload_id,
            key,
            content_type: intent.content_type,
            metadata,
        })
    }

    #[instrument(skip(self))]
    async fn part_upload_target(
        &self,
        upload_id: &UploadId,
        key: &str,
        part_number: i64,
    ) -> BlobResult<PresignedTarget> {
        let part_number = validate::part_number(part_number)?;
        let key = Self::session_ref(upload_id, key)?;

        self.presign.sign_part(upload_id, key, part_number).await
    }

    #[instrument(skip(self))]
    async fn list_parts(
        &self,
        upload_id: &UploadId,
        key: &str,
    ) -> BlobResult<Vec<PartDescriptor>> {
        let key = Self::session_ref(upload_id, key)?;

        let mut parts = Vec::new();
        let mut marker: Option<u32> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .store
                .list_parts_page(upload_id, key, marker.map(|m| m.to_string()).as_deref())
                .await?;
            pages += 1;
            parts.extend(page.parts);

            if parts.len() > MAX_PART_NUMBER as usize {
                return Err(BlobError::store_message(
                    "list_parts",
                    format!(
                        "listing returned more than {} parts after page {}",
                        MAX_PART_NUMBER, pages
                    ),
                ));
            }

            if !page.is_truncated {
                break;
            }

            // Markers are part numbers and must strictly increase
            let next = page
                .next_part_number_marker
                .as_deref()
                .and_then(|raw| raw.trim().parse::<u32>().ok());
            match next {
                Some(next) if marker.map_or(true, |prev| next > prev) => marker = Some(next),
                _ => {
                    return Err(BlobError::store_message(
                        "list_parts",
                        format!(
                            "listing truncated after page {} without an advancing part number marker ({:?})",
                            pages, page.next_part_number_marker
                        ),
                    ))
                }
            }
        }

        parts.sort_by_key(|part| part.part_number);
        parts.dedup_by_key(|part| part.part_number);

        debug!(pages, parts = parts.len(), "listed parts");
        Ok(parts)
    }

    #[instrument(skip(self, claimed), fields(claimed = claimed.len()))]
    async fn complete(
        &self,
        upload_id: &UploadId,
        key: &str,
        claimed: &[ClaimedPart],
    ) -> BlobResult<UploadReceipt> {
        let key = Self::session_ref(upload_id, key)?;
        if claimed.is_empty() {
            return Err(BlobError::validation(
                "parts must be an array of part numbers to complete the multipart upload.",
            ));
        }

        let authoritative = self.list_parts(upload_id, key).await?;

        if !parts_reconcile(&authoritative, claimed) {
            warn!(
                stored = authoritative.len(),
                claimed = claimed.len(),
                "claimed parts do not match the store's listing"
            );
            return Err(BlobError::reconciliation(authoritative, claimed.to_vec()));
        }

        if let Some(part) = authoritative.iter().find(|p| p.completed_etag().is_none()) {
            warn!(part_number = part.part_number, "listed part has no ETag");
            return Err(BlobError::integrity(part.part_number));
        }

        let location = self
            .store
            .complete_multipart(upload_id, key, &authoritative)
            .await?;

        info!(%upload_id, key, parts = authoritative.len(), "multipart upload completed");

        Ok(UploadReceipt::new(upload_id.clone(), key.to_string(), authoritative.len() as u32)
            .with_location(location))
    }

    #[instrument(skip(self))]
    async fn abort(&self, upload_id: &UploadId, key: &str) -> BlobResult<()> {
        let key = Self::session_ref(upload_id, key)?;

        self.store.abort_multipart(upload_id, key).await?;

        info!(%upload_id, key, "multipart upload aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(numbers: &[u32]) -> Vec<PartDescriptor> {
        numbers.iter().map(|n| PartDescriptor::new(*n).with_etag(format!("e{n}"))).collect()
    }

    fn claim(numbers: &[u32]) -> Vec<ClaimedPart> {
        numbers.iter().copied().map(ClaimedPart::new).collect()
    }

    #[test]
    fn reconcile_requires_same_numbers_in_same_positions() {
        assert!(parts_reconcile(&stored(&[1, 2, 3]), &claim(&[1, 2, 3])));
        assert!(!parts_reconcile(&stored(&[1, 2, 4]), &claim(&[1, 2, 3])));
        assert!(!parts_reconcile(&stored(&[1, 2, 3]), &claim(&[1, 3, 2])));
    }

    #[test]
    fn reconcile_rejects_length_mismatch_in_both_directions() {
        assert!(!parts_reconcile(&stored(&[1, 2, 3]), &claim(&[1, 2])));
        assert!(!parts_reconcile(&stored(&[1, 2]), &claim(&[1, 2, 3])));
    }
}
