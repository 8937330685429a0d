//! Error types for the synchronized document engine.
//!
//! These errors surface from container and document access. Transient availability
//! failures are passed through to callers unmodified so they can apply their own
//! retry policy.

use thiserror::Error;

/// Structured error types for engine operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// The container could not be opened or created right now
    #[error("Container '{container_id}' is unavailable: {reason}")]
    ContainerUnavailable {
        container_id: String,
        reason: String,
    },

    /// The container does not exist in this engine
    #[error("Container not found: {container_id}")]
    ContainerNotFound { container_id: String },

    /// A list position was outside the current bounds
    #[error("Index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A participant address did not have the `name@domain` shape
    #[error("Invalid participant address: {address}")]
    InvalidParticipant { address: String },

    /// Applying or decoding a replication update failed
    #[error("Update for container '{container_id}' failed: {reason}")]
    UpdateFailed {
        container_id: String,
        reason: String,
    },

    /// A persisted snapshot did not have the expected structure
    #[error("Snapshot corrupted: {reason}")]
    SnapshotCorrupted { reason: String },
}

impl EngineError {
    /// Check if this error is transient and may succeed when retried
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::ContainerUnavailable { .. })
    }

    /// Check if this error indicates a resource was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::ContainerNotFound { .. })
    }

    /// Check if this error indicates corrupted or undecodable data
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            EngineError::UpdateFailed { .. } | EngineError::SnapshotCorrupted { .. }
        )
    }

    /// Check if this error was caused by invalid input from the caller
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::IndexOutOfBounds { .. } | EngineError::InvalidParticipant { .. }
        )
    }

    /// Get the container id if this error is container-specific
    pub fn container_id(&self) -> Option<&str> {
        match self {
            EngineError::ContainerUnavailable { container_id, .. }
            | EngineError::ContainerNotFound { container_id }
            | EngineError::UpdateFailed { container_id, .. } => Some(container_id),
            _ => None,
        }
    }
}

// Conversion from EngineError to the main Error type
impl From<EngineError> for crate::Error {
    fn from(err: EngineError) -> Self {
        crate::Error::Engine(err)
    }
}
