//! # relay-blob: multipart upload coordination for S3-compatible stores
//!
//! `relay-blob` lets a service hand out upload capability without ever
//! touching the bytes. Clients receive presigned URLs and PUT straight to the
//! store; this crate only tracks which parts the store has and decides when an
//! upload may be finalized.
//!
//! ## Key Features
//!
//! - **Presigned single-shot uploads**: one signed PUT for small objects
//! - **Multipart sessions**: open, presign parts, list, complete, abort
//! - **Reconciliation**: completion only proceeds when the client's part list
//!   matches the store's own listing, and ETags are taken from the store only
//! - **Stateless**: the store is the single source of truth; nothing is cached
//! - **Storage agnostic**: the coordinator talks to traits, with an AWS SDK
//!   adapter and an in-memory store included
//!
//! ## Quick Start
//!
//! ```rust
//! use relay_blob::prelude::*;
//! use relay_blob::MemoryBlobStore;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryBlobStore::new("uploads");
//! let uploads = DefaultUploadCoordinator::new(store.clone(), BlobConfig::default());
//!
//! // 1. Open a session
//! let session = uploads
//!     .open_session(UploadIntent::new("video.mp4", "video/mp4"))
//!     .await?;
//!
//! // 2. Hand the client a URL per part; it uploads directly to the store
//! let target = uploads.part_upload_target(&session.upload_id, &session.key, 1).await?;
//! assert_eq!(target.method, "PUT");
//! # store.record_part(&session.upload_id, 1, Some("\"etag-1\"")).await?;
//!
//! // 3. Complete with the part numbers the client believes it uploaded
//! let receipt = uploads
//!     .complete(&session.upload_id, &session.key, &[ClaimedPart::new(1)])
//!     .await?;
//! assert!(receipt.location.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │   HTTP boundary          │  ← request parsing, response shaping
//! ├──────────────────────────┤
//! │   UploadCoordinator      │  ← validation, pagination, reconciliation
//! │   PresignService         │  ← signed upload targets
//! ├──────────────────────────┤
//! │   MultipartBlobStore     │  ← store primitives
//! │   SignedUrlBlobStore     │
//! └──────────────────────────┘
//! ```

mod config;
mod coordinator;
mod error;
pub mod memory_store;
mod presign;
mod receipt;
mod s3_store;
pub mod store;
mod types;
mod upload;
pub mod validate;

// Re-export main types for clean API
pub use config::{BlobConfig, DEFAULT_KEY_PREFIX, MAX_PART_NUMBER, MIN_PART_NUMBER, PRESIGN_EXPIRY_SECS};
pub use coordinator::DefaultUploadCoordinator;
pub use error::{BlobError, BlobResult};
pub use memory_store::{MemoryBlobStore, MemoryObject};
pub use presign::PresignService;
pub use receipt::{PresignedUpload, UploadReceipt};
pub use s3_store::{S3CompatibleStore, S3Config};
pub use store::{BlobKeyStrategy, DefaultKeyStrategy, MultipartBlobStore, SignedUrlBlobStore};
pub use types::{
    ClaimedPart, ObjectMetadata, PartDescriptor, PartsPage, PresignedTarget, UploadId,
    UploadSession,
};
pub use upload::{UploadCoordinator, UploadIntent};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobConfig, BlobError, BlobResult, ClaimedPart, DefaultUploadCoordinator,
        PresignService, UploadCoordinator, UploadId, UploadIntent,
    };
}
