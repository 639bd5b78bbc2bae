use serde_json::Value;
use thiserror::Error;

use crate::{ClaimedPart, PartDescriptor};

/// Result type for upload operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while coordinating an upload
#[derive(Error, Debug)]
pub enum BlobError {
    /// Malformed or out-of-range caller input, detected before any store call
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        /// `{field: [messages]}` when the failure came from a derived check
        errors: Option<Value>,
    },

    /// The client's claimed part list disagrees with the store's listing
    #[error(
        "Parts do not match the parts in the multipart upload (store has {}, client claimed {})",
        .authoritative.len(),
        .claimed.len()
    )]
    Reconciliation {
        authoritative: Vec<PartDescriptor>,
        claimed: Vec<ClaimedPart>,
    },

    /// A listed part was registered but carries no ETag
    #[error("Part {part_number} has no ETag; it was never durably received")]
    Integrity { part_number: u32 },

    /// The remote store rejected or failed a call
    #[error("Store call failed: {operation}")]
    Store {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BlobError {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            errors: None,
        }
    }

    /// Validation error with per-field messages attached
    pub fn validation_with_errors<S: Into<String>>(message: S, errors: Value) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Some(errors),
        }
    }

    /// Create a reconciliation error carrying both part sequences
    pub fn reconciliation(authoritative: Vec<PartDescriptor>, claimed: Vec<ClaimedPart>) -> Self {
        Self::Reconciliation {
            authoritative,
            claimed,
        }
    }

    /// Create an integrity error for a part without an ETag
    pub fn integrity(part_number: u32) -> Self {
        Self::Integrity { part_number }
    }

    /// Wrap a store failure for the named operation
    pub fn store<E>(operation: &'static str, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store {
            operation,
            source: Box::new(error),
        }
    }

    /// Store failure from a plain message (used by in-process stores)
    pub fn store_message<S: Into<String>>(operation: &'static str, message: S) -> Self {
        let message: String = message.into();
        Self::Store {
            operation,
            source: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}
