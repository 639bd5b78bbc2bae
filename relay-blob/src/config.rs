use std::time::Duration;

/// Lowest part number accepted by the multipart protocol
pub const MIN_PART_NUMBER: u32 = 1;

/// Highest part number accepted by the multipart protocol
pub const MAX_PART_NUMBER: u32 = 10_000;

/// Lifetime of every presigned upload target
pub const PRESIGN_EXPIRY_SECS: u64 = 3600;

/// Key namespace used when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "test";

/// Configuration for upload coordination
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Namespace every generated key lives under (`{prefix}/{uuid}-{filename}`)
    pub key_prefix: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl BlobConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key namespace
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Expiry handed to the signer for every upload target
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(PRESIGN_EXPIRY_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix_and_expiry() {
        let config = BlobConfig::default();
        assert_eq!(config.key_prefix, "test");
        assert_eq!(config.presign_expiry(), Duration::from_secs(3600));
    }
}
