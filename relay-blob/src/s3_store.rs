use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Part};
use aws_sdk_s3::Client;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    BlobError, BlobResult, MultipartBlobStore, ObjectMetadata, PartDescriptor, PartsPage,
    SignedUrlBlobStore, UploadId,
};

/// Connection settings for an S3-compatible store
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Endpoint override for S3-compatible services; implies path-style addressing
    pub endpoint_url: Option<String>,
}

impl S3Config {
    /// Read `AWS_REGION`, `AWS_KEY`, `AWS_SECRET`, `AWS_BUCKET` and the
    /// optional `AWS_ENDPOINT_URL`
    pub fn from_env() -> BlobResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> BlobResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                BlobError::validation(format!("{} environment variable required", key))
            })
        };

        Ok(Self {
            bucket: require("AWS_BUCKET")?,
            region: require("AWS_REGION")?,
            access_key_id: require("AWS_KEY")?,
            secret_access_key: require("AWS_SECRET")?,
            endpoint_url: get("AWS_ENDPOINT_URL"),
        })
    }
}

/// Store backed by the AWS SDK; works against S3 and S3-compatible services
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
}

impl S3CompatibleStore {
    pub async fn new(config: S3Config) -> Self {
        let bucket = config.bucket.clone();
        let client = Self::create_client(config).await;
        Self { client, bucket }
    }

    /// Build from the environment (see `S3Config::from_env`)
    pub async fn from_env() -> BlobResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_client(config: S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "relay-env",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.endpoint_url.is_some())
                .build(),
        )
    }

    fn presigning(operation: &'static str, expires_in: Duration) -> BlobResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in).map_err(|err| BlobError::store(operation, err))
    }

    fn part_descriptor(part: &Part) -> Option<PartDescriptor> {
        let part_number = part.part_number().and_then(|n| u32::try_from(n).ok())?;
        let mut descriptor = PartDescriptor::new(part_number);
        descriptor.etag = part.e_tag().map(str::to_string);
        descriptor.size = part.size();
        descriptor.last_modified = part.last_modified().map(|dt| dt.secs());
        Some(descriptor)
    }
}

/// Log the full SDK error chain, then wrap it
fn map_aws_error<E>(operation: &'static str) -> impl FnOnce(E) -> BlobError
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |err| {
        warn!(operation, error = %DisplayErrorContext(&err), "s3 call failed");
        BlobError::store(operation, err)
    }
}

#[async_trait]
impl MultipartBlobStore for S3CompatibleStore {
    async fn create_multipart(
        &self,
        key: &str,
        content_type: &str,
        metadata: Option<&ObjectMetadata>,
    ) -> BlobResult<UploadId> {
        let metadata: Option<HashMap<String, String>> =
            metadata.map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect());

        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(metadata)
            .send()
            .await
            .map_err(map_aws_error("create_multipart"))?;

        output
            .upload_id()
            .map(|id| UploadId::from_string(id.to_string()))
            .ok_or_else(|| BlobError::store_message("create_multipart", "store returned no UploadId"))
    }

    async fn list_parts_page(
        &self,
        upload_id: &UploadId,
        key: &str,
        marker: Option<&str>,
    ) -> BlobResult<PartsPage> {
        let output = self
            .client
            .list_parts()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id.as_str())
            .set_part_number_marker(marker.map(str::to_string))
            .send()
            .await
            .map_err(map_aws_error("list_parts"))?;

        let parts = output
            .parts()
            .iter()
            .filter_map(Self::part_descriptor)
            .collect::<Vec<_>>();
        debug!(count = parts.len(), truncated = ?output.is_truncated(), "listed part page");

        Ok(PartsPage {
            parts,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_part_number_marker: output.next_part_number_marker().map(str::to_string),
        })
    }

    async fn complete_multipart(
        &self,
        upload_id: &UploadId,
        key: &str,
        parts: &[PartDescriptor],
    ) -> BlobResult<Option<String>> {
        let completed = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number as i32)
                    .set_e_tag(part.etag.clone())
                    .build()
            })
            .collect::<Vec<_>>();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id.as_str())
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(map_aws_error("complete_multipart"))?;

        Ok(output.location().map(str::to_string))
    }

    async fn abort_multipart(&self, upload_id: &UploadId, key: &str) -> BlobResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id.as_str())
            .send()
            .await
            .map_err(map_aws_error("abort_multipart"))?;
        Ok(())
    }
}

#[async_trait]
impl SignedUrlBlobStore for S3CompatibleStore {
    async fn sign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> BlobResult<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presigning("sign_put", expires_in)?)
            .await
            .map_err(map_aws_error("sign_put"))?;
        Ok(presigned.uri().to_string())
    }

    async fn sign_upload_part(
        &self,
        upload_id: &UploadId,
        key: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> BlobResult<String> {
        // No body is attached: the signature covers an empty placeholder and
        // the client sends the part bytes straight to the store.
        let presigned = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id.as_str())
            .part_number(part_number as i32)
            .presigned(Self::presigning("sign_upload_part", expires_in)?)
            .await
            .map_err(map_aws_error("sign_upload_part"))?;
        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn config_requires_credentials_and_bucket() {
        let env = vars(&[("AWS_REGION", "us-east-1"), ("AWS_KEY", "k"), ("AWS_SECRET", "s")]);
        let err = S3Config::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("AWS_BUCKET"));
    }

    #[test]
    fn blank_endpoint_means_aws() {
        let env = vars(&[
            ("AWS_REGION", "eu-west-1"),
            ("AWS_KEY", "k"),
            ("AWS_SECRET", "s"),
            ("AWS_BUCKET", "uploads"),
            ("AWS_ENDPOINT_URL", " "),
        ]);
        let config = S3Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.bucket, "uploads");
        assert_eq!(config.endpoint_url, None);
    }

    #[tokio::test]
    async fn presigned_part_url_carries_session_and_expiry() {
        let store = S3CompatibleStore::new(S3Config {
            bucket: "uploads".into(),
            region: "us-east-1".into(),
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            endpoint_url: Some("http://localhost:9000".into()),
        })
        .await;

        let url = store
            .sign_upload_part(&UploadId::from("abc"), "test/a.bin", 3, Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/uploads/test/a.bin?"));
        assert!(url.contains("partNumber=3"));
        assert!(url.contains("uploadId=abc"));
        assert!(url.contains("X-Amz-Expires=3600"));
    }
}
