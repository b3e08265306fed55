//! Error types for hearth-access
//!
//! Only write paths (granting, requesting, responding, config loading) surface
//! these. Read paths resolve to fail-closed values instead.

use thiserror::Error;
use uuid::Uuid;

/// Error type for permission engine write operations
#[derive(Debug, Error)]
pub enum AccessError {
    /// No resolvable member identity
    #[error("No authenticated member")]
    AuthenticationMissing,

    /// Member does not exist in the store
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    /// Access request does not exist in the store
    #[error("Access request not found: {0}")]
    RequestNotFound(Uuid),

    /// Backing store could not be reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Unrecognized action: {0}")]
    UnrecognizedAction(String),

    #[error("Unrecognized category: {0}")]
    UnrecognizedCategory(String),

    #[error("Unrecognized permission level: {0}")]
    UnrecognizedLevel(String),

    #[error("Unrecognized role: {0}")]
    UnrecognizedRole(String),

    #[error("Unrecognized request status: {0}")]
    UnrecognizedStatus(String),

    /// Access request is not pending, or the responder may not move it
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Actor lacks the role required for a write
    #[error("Unauthorized: {actor} cannot {action}")]
    Unauthorized { actor: String, action: String },

    /// Write payload failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for permission engine operations
pub type AccessResult<T> = std::result::Result<T, AccessError>;
