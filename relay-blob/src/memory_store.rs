use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    BlobError, BlobResult, MultipartBlobStore, ObjectMetadata, PartDescriptor, PartsPage,
    SignedUrlBlobStore, UploadId,
};

/// Page size S3 uses for ListParts when none is requested
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

/// In-memory implementation of the store contract.
///
/// Used as the test double and for local runs without a bucket. Part bytes
/// never reach it; `record_part` stands in for the client's direct upload.
#[derive(Clone)]
pub struct MemoryBlobStore {
    bucket: String,
    page_size: usize,
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    uploads: HashMap<String, MemoryUpload>,
    objects: HashMap<String, MemoryObject>,
    calls: Vec<&'static str>,
}

struct MemoryUpload {
    key: String,
    content_type: String,
    metadata: Option<ObjectMetadata>,
    parts: BTreeMap<u32, PartDescriptor>,
}

/// An object assembled by `complete_multipart`
#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub content_type: String,
    pub metadata: Option<ObjectMetadata>,
    /// The part list the object was finalized with, as sent by the caller
    pub parts: Vec<PartDescriptor>,
}

impl MemoryBlobStore {
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            page_size: DEFAULT_LIST_PAGE_SIZE,
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Limit how many parts one listing page returns
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register a part as the store would after the client's direct PUT.
    /// `etag` of `None` models a part whose bytes never fully arrived.
    pub async fn record_part(
        &self,
        upload_id: &UploadId,
        part_number: u32,
        etag: Option<&str>,
    ) -> BlobResult<()> {
        let mut state = self.state.lock().await;
        let upload = state
            .uploads
            .get_mut(upload_id.as_str())
            .ok_or_else(|| no_such_upload("upload_part", upload_id))?;

        let mut part = PartDescriptor::new(part_number)
            .with_last_modified(chrono::Utc::now().timestamp());
        if let Some(etag) = etag {
            part = part.with_etag(etag);
        }
        upload.parts.insert(part_number, part);
        Ok(())
    }

    /// Whether the session is still open
    pub async fn has_upload(&self, upload_id: &UploadId) -> bool {
        self.state.lock().await.uploads.contains_key(upload_id.as_str())
    }

    /// Object finalized under `key`, if any
    pub async fn object(&self, key: &str) -> Option<MemoryObject> {
        self.state.lock().await.objects.get(key).cloned()
    }

    /// Names of the store operations invoked so far, in order
    pub async fn calls(&self) -> Vec<&'static str> {
        self.state.lock().await.calls.clone()
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }
}

fn no_such_upload(operation: &'static str, upload_id: &UploadId) -> BlobError {
    BlobError::store_message(
        operation,
        format!("NoSuchUpload: the upload {} does not exist", upload_id),
    )
}

#[async_trait]
impl MultipartBlobStore for MemoryBlobStore {
    async fn create_multipart(
        &self,
        key: &str,
        content_type: &str,
        metadata: Option<&ObjectMetadata>,
    ) -> BlobResult<UploadId> {
        let mut state = self.state.lock().await;
        state.calls.push("create_multipart");

        let upload_id = UploadId::from_string(format!("mpu_{}", Uuid::new_v4().simple()));
        state.uploads.insert(
            upload_id.as_str().to_string(),
            MemoryUpload {
                key: key.to_string(),
                content_type: content_type.to_string(),
                metadata: metadata.cloned(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn list_parts_page(
        &self,
        upload_id: &UploadId,
        key: &str,
        marker: Option<&str>,
    ) -> BlobResult<PartsPage> {
        let mut state = self.state.lock().await;
        state.calls.push("list_parts");

        let after = match marker {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                BlobError::store_message("list_parts", format!("invalid part number marker '{}'", raw))
            })?,
            None => 0,
        };

        let upload = state
            .uploads
            .get(upload_id.as_str())
            .filter(|upload| upload.key == key)
            .ok_or_else(|| no_such_upload("list_parts", upload_id))?;

        let mut remaining = upload.parts.range((Excluded(after), Unbounded)).map(|(_, part)| part);
        let parts: Vec<PartDescriptor> = remaining.by_ref().take(self.page_size).cloned().collect();
        let is_truncated = remaining.next().is_some();
        let next_part_number_marker = parts.last().map(|part| part.part_number.to_string());

        Ok(PartsPage {
            parts,
            is_truncated,
            next_part_number_marker,
        })
    }

    async fn complete_multipart(
        &self,
        upload_id: &UploadId,
        key: &str,
        parts: &[PartDescriptor],
    ) -> BlobResult<Option<String>> {
        let mut state = self.state.lock().await;
        state.calls.push("complete_multipart");

        let upload = state
            .uploads
            .get(upload_id.as_str())
            .filter(|upload| upload.key == key)
            .ok_or_else(|| no_such_upload("complete_multipart", upload_id))?;

        if parts.is_empty() {
            return Err(BlobError::store_message(
                "complete_multipart",
                "MalformedXML: at least one part is required",
            ));
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(BlobError::store_message(
                "complete_multipart",
                "InvalidPartOrder: parts must be in ascending order",
            ));
        }
        for part in parts {
            let stored = upload.parts.get(&part.part_number);
            let etag_matches = matches!(
                (stored.and_then(|p| p.etag.as_deref()), part.etag.as_deref()),
                (Some(stored), Some(sent)) if stored == sent
            );
            if !etag_matches {
                return Err(BlobError::store_message(
                    "complete_multipart",
                    format!("InvalidPart: part {} could not be found", part.part_number),
                ));
            }
        }

        let upload = state
            .uploads
            .remove(upload_id.as_str())
            .ok_or_else(|| no_such_upload("complete_multipart", upload_id))?;
        state.objects.insert(
            upload.key,
            MemoryObject {
                content_type: upload.content_type,
                metadata: upload.metadata,
                parts: parts.to_vec(),
            },
        );

        Ok(Some(self.location(key)))
    }

    async fn abort_multipart(&self, upload_id: &UploadId, key: &str) -> BlobResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push("abort_multipart");

        let exists = state
            .uploads
            .get(upload_id.as_str())
            .is_some_and(|upload| upload.key == key);
        if !exists {
            return Err(no_such_upload("abort_multipart", upload_id));
        }
        state.uploads.remove(upload_id.as_str());
        Ok(())
    }
}

#[async_trait]
impl SignedUrlBlobStore for MemoryBlobStore {
    async fn sign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> BlobResult<String> {
        self.state.lock().await.calls.push("sign_put");
        Ok(format!(
            "{}?content-type={}&expires={}",
            self.location(key),
            content_type,
            expires_in.as_secs()
        ))
    }

    async fn sign_upload_part(
        &self,
        upload_id: &UploadId,
        key: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> BlobResult<String> {
        self.state.lock().await.calls.push("sign_upload_part");
        Ok(format!(
            "{}?uploadId={}&partNumber={}&expires={}",
            self.location(key),
            upload_id,
            part_number,
            expires_in.as_secs()
        ))
    }
}
