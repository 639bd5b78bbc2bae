use std::sync::Arc;

use relay_blob::{PresignService, UploadCoordinator};

/// Shared handler state. Both members are stateless handles onto the store.
#[derive(Clone)]
pub struct RelayState {
    pub uploads: Arc<dyn UploadCoordinator>,
    pub presign: PresignService,
}

impl RelayState {
    pub fn new(uploads: Arc<dyn UploadCoordinator>, presign: PresignService) -> Self {
        Self { uploads, presign }
    }
}
