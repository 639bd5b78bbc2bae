#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use relay_blob::{
    BlobError, BlobResult, MultipartBlobStore, ObjectMetadata, PartDescriptor, PartsPage,
    SignedUrlBlobStore, UploadId,
};

/// Store that replays fixed listing pages and records what it was asked
pub struct ScriptedStore {
    pages: Vec<PartsPage>,
    cycle: bool,
    sign_delay: Option<Duration>,
    signed_at: Mutex<Vec<i64>>,
    location: Option<String>,
    markers: Mutex<Vec<Option<String>>>,
    completed_with: Mutex<Option<Vec<PartDescriptor>>>,
}

impl ScriptedStore {
    pub fn with_pages(pages: Vec<PartsPage>) -> Self {
        Self {
            pages,
            cycle: false,
            sign_delay: None,
            signed_at: Mutex::new(Vec::new()),
            location: Some("https://bucket.s3.us-east-1.amazonaws.com/test/object".to_string()),
            markers: Mutex::new(Vec::new()),
            completed_with: Mutex::new(None),
        }
    }

    /// Replay `pages` forever, starting over after the last one
    pub fn cycling(pages: Vec<PartsPage>) -> Self {
        Self {
            cycle: true,
            ..Self::with_pages(pages)
        }
    }

    /// Hold every signing call for `delay` before answering
    pub fn with_sign_delay(mut self, delay: Duration) -> Self {
        self.sign_delay = Some(delay);
        self
    }

    /// Unix seconds at which each signing call returned
    pub fn signed_at(&self) -> Vec<i64> {
        self.signed_at.lock().unwrap().clone()
    }

    async fn signing(&self) {
        if let Some(delay) = self.sign_delay {
            tokio::time::sleep(delay).await;
        }
        self.signed_at.lock().unwrap().push(chrono::Utc::now().timestamp());
    }

    pub fn markers(&self) -> Vec<Option<String>> {
        self.markers.lock().unwrap().clone()
    }

    pub fn completed_with(&self) -> Option<Vec<PartDescriptor>> {
        self.completed_with.lock().unwrap().clone()
    }
}

/// A page of parts numbered `numbers`, each with ETag `"e{n}"`
pub fn page(numbers: &[u32], is_truncated: bool) -> PartsPage {
    PartsPage {
        parts: numbers
            .iter()
            .map(|n| PartDescriptor::new(*n).with_etag(format!("\"e{n}\"")))
            .collect(),
        is_truncated,
        next_part_number_marker: numbers.last().map(|n| n.to_string()),
    }
}

#[async_trait]
impl MultipartBlobStore for ScriptedStore {
    async fn create_multipart(
        &self,
        _key: &str,
        _content_type: &str,
        _metadata: Option<&ObjectMetadata>,
    ) -> BlobResult<UploadId> {
        Ok(UploadId::from("scripted-upload"))
    }

    async fn list_parts_page(
        &self,
        _upload_id: &UploadId,
        _key: &str,
        marker: Option<&str>,
    ) -> BlobResult<PartsPage> {
        let mut markers = self.markers.lock().unwrap();
        let index = match self.cycle {
            true if !self.pages.is_empty() => markers.len() % self.pages.len(),
            _ => markers.len(),
        };
        markers.push(marker.map(str::to_string));
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| BlobError::store_message("list_parts", "no more scripted pages"))
    }

    async fn complete_multipart(
        &self,
        _upload_id: &UploadId,
        _key: &str,
        parts: &[PartDescriptor],
    ) -> BlobResult<Option<String>> {
        *self.completed_with.lock().unwrap() = Some(parts.to_vec());
        Ok(self.location.clone())
    }

    async fn abort_multipart(&self, _upload_id: &UploadId, _key: &str) -> BlobResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SignedUrlBlobStore for ScriptedStore {
    async fn sign_put(&self, key: &str, _content_type: &str, expires_in: Duration) -> BlobResult<String> {
        self.signing().await;
        Ok(format!("https://signed/{key}?X-Amz-Expires={}", expires_in.as_secs()))
    }

    async fn sign_upload_part(
        &self,
        upload_id: &UploadId,
        key: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> BlobResult<String> {
        self.signing().await;
        Ok(format!(
            "https://signed/{key}?uploadId={upload_id}&partNumber={part_number}&X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}
