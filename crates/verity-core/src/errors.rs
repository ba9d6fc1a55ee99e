//! Unified error system for Verity
//!
//! One error type crosses every crate boundary. Callers map variants onto
//! transport semantics with [`VerityError::status_code`]; the variants are
//! chosen so that a version race (`Conflict`) or a committee routing mistake
//! (`CommitteeApprovalRequired`) can be told apart from a generic failure.

use serde::{Deserialize, Serialize};

/// Unified error type for all Verity operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum VerityError {
    /// Missing field or wrong status for the requested transition
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Unknown letter, version, issuance or request
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Actor lacks the role or membership required for the action
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Error message describing the permission issue
        message: String,
    },

    /// Shared-secret gate rejected the caller
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message describing the rejected credential
        message: String,
    },

    /// Direct approval attempted on a letter routed to a committee
    #[error("Letter is assigned to committee {committee_id}; use the committee approval path")]
    CommitteeApprovalRequired {
        /// Committee the letter is assigned to
        committee_id: String,
    },

    /// Precondition (expected version or status) no longer holds
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message describing the conflicting state
        message: String,
    },

    /// Persistence layer failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Document rendering failed
    #[error("Rendering error: {message}")]
    Rendering {
        /// Error message describing the rendering failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl VerityError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a committee routing error
    pub fn committee_approval_required(committee_id: impl Into<String>) -> Self {
        Self::CommitteeApprovalRequired {
            committee_id: committee_id.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a rendering error
    pub fn rendering(message: impl Into<String>) -> Self {
        Self::Rendering {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a caller may retry the request after re-reading state
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// HTTP-equivalent status code for the transport layer
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Invalid { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::PermissionDenied { .. } | Self::CommitteeApprovalRequired { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Rendering { .. } => 502,
            Self::Storage { .. } | Self::Serialization { .. } | Self::Internal { .. } => 500,
        }
    }
}

/// Standard Result type for Verity operations
pub type Result<T> = std::result::Result<T, VerityError>;

impl From<serde_json::Error> for VerityError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for VerityError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}
