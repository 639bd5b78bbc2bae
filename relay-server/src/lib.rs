pub mod config;

use std::sync::Arc;

use relay_axum::{relay, RelayApp, RelayState};
use relay_blob::{BlobConfig, DefaultUploadCoordinator, MemoryBlobStore, S3CompatibleStore};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub use config::{ServerConfig, StoreBackend};

/// Bucket name reported by the in-memory backend
const MEMORY_BUCKET: &str = "relay-local";

pub async fn build(config: &ServerConfig) -> anyhow::Result<RelayApp> {
    let blob_config = BlobConfig::new().with_key_prefix(config.key_prefix.clone());

    let coordinator = match &config.store {
        StoreBackend::S3(s3) => {
            info!(bucket = %s3.bucket, region = %s3.region, endpoint = ?s3.endpoint_url, "using S3 store");
            DefaultUploadCoordinator::new(S3CompatibleStore::new(s3.clone()).await, blob_config)
        }
        StoreBackend::Memory => {
            warn!("using in-memory store; uploads are lost on restart");
            DefaultUploadCoordinator::new(MemoryBlobStore::new(MEMORY_BUCKET), blob_config)
        }
    };

    let presign = coordinator.presign().clone();
    let state = RelayState::new(Arc::new(coordinator), presign);

    let mut ax = relay(state)
        .use_get("/", || async { "ok" })
        .use_get("/health", || async { "ok" });

    ax.router = ax.router.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    Ok(ax)
}
