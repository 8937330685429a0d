//! Error types for the object mapping layer.
//!
//! Structural errors (`InvalidAddress`, `NotAttached`, `AlreadyAttached`) are caller
//! bugs: they are detected eagerly and never retried. Integrity errors
//! (`DanglingReference`, `MalformedToken`, `CyclicReference`) signal stored data that
//! cannot be materialized: they are reported, never masked.

use thiserror::Error;

/// Structured error types for object operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Container or document identifiers do not form a valid address
    #[error("Invalid address '{container_id}'/'{document_id}': {reason}")]
    InvalidAddress {
        container_id: String,
        document_id: String,
        reason: String,
    },

    /// A value without an address was used where an attached node is required
    #[error("Value of type {kind} is not attached")]
    NotAttached { kind: &'static str },

    /// An attached node was placed under a second parent
    #[error("Node {address} is already attached at {owner}")]
    AlreadyAttached { address: String, owner: String },

    /// A stored token points at a container or document that cannot be opened
    #[error("Dangling reference {token}: {reason}")]
    DanglingReference { token: String, reason: String },

    /// A stored token is neither an address nor a primitive encoding
    #[error("Malformed token: {token:?}")]
    MalformedToken { token: String },

    /// A key holds a different kind of value than requested
    #[error("Type mismatch at '{key}': expected {expected}, found {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Materialization revisited a node already on the current path
    #[error("Cyclic reference to {address}")]
    CyclicReference { address: String },
}

impl ObjectError {
    pub fn is_invalid_address(&self) -> bool {
        matches!(self, ObjectError::InvalidAddress { .. })
    }

    pub fn is_not_attached(&self) -> bool {
        matches!(self, ObjectError::NotAttached { .. })
    }

    pub fn is_already_attached(&self) -> bool {
        matches!(self, ObjectError::AlreadyAttached { .. })
    }

    pub fn is_dangling_reference(&self) -> bool {
        matches!(self, ObjectError::DanglingReference { .. })
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, ObjectError::TypeMismatch { .. })
    }

    /// Check if this error indicates stored data that cannot be materialized
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            ObjectError::DanglingReference { .. }
                | ObjectError::MalformedToken { .. }
                | ObjectError::CyclicReference { .. }
        )
    }

    /// Check if this error was caused by misuse of the API
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ObjectError::InvalidAddress { .. }
                | ObjectError::NotAttached { .. }
                | ObjectError::AlreadyAttached { .. }
                | ObjectError::TypeMismatch { .. }
        )
    }

    /// Get the offending token if this is a token-related error
    pub fn token(&self) -> Option<&str> {
        match self {
            ObjectError::DanglingReference { token, .. } | ObjectError::MalformedToken { token } => {
                Some(token)
            }
            _ => None,
        }
    }
}

// Conversion from ObjectError to the main Error type
impl From<ObjectError> for crate::Error {
    fn from(err: ObjectError) -> Self {
        crate::Error::Object(err)
    }
}
