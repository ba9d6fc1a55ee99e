//! Audit trail entries

use super::identifiers::{ActorId, LetterId};
use super::Timestamp;
use serde::{Deserialize, Serialize};

/// Transition recorded in the audit trail
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Approve,
    CommitteeApprove,
    Reject,
    Revoke,
    Issue,
    Print,
    ReprintRequest,
    ReprintApprove,
    ReprintReject,
    Acknowledge,
}

/// One audited transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Transition
    pub action: AuditAction,
    /// Letter the transition applies to
    pub letter_id: LetterId,
    /// Actor who triggered it
    pub actor_id: ActorId,
    /// When it was committed
    pub at: Timestamp,
    /// Free-form context (approver, channel, fingerprint, ...)
    pub metadata: serde_json::Value,
}

impl AuditEntry {
    /// Create an entry with empty metadata
    pub fn new(action: AuditAction, letter_id: LetterId, actor_id: ActorId, at: Timestamp) -> Self {
        Self {
            action,
            letter_id,
            actor_id,
            at,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
