//! Approval records
//!
//! Direct and committee approvals are separate append-only logs. Once one of
//! them has been selected as authoritative it is carried as an [`Approval`],
//! whose variant records the provenance.

use super::identifiers::{ActorId, CommitteeId, LetterId};
use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Approval granted by a single approver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectApproval {
    /// Approved letter
    pub letter_id: LetterId,
    /// Approver
    pub approver_id: ActorId,
    /// Optional remark
    pub comment: Option<String>,
    /// Approval time; absent on legacy rows
    pub approved_at: Option<Timestamp>,
}

/// Approval granted on behalf of a committee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeApproval {
    /// Approved letter
    pub letter_id: LetterId,
    /// Approving committee
    pub committee_id: CommitteeId,
    /// Chair or member who recorded the decision
    pub approver_id: ActorId,
    /// Optional remark
    pub comment: Option<String>,
    /// Approval time; absent on legacy rows
    pub approved_at: Option<Timestamp>,
}

/// Full approval history of a letter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalHistory {
    /// Direct approvals in insertion order
    pub direct: Vec<DirectApproval>,
    /// Committee approvals in insertion order
    pub committee: Vec<CommitteeApproval>,
}

impl ApprovalHistory {
    /// Whether no approval of either kind exists
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.committee.is_empty()
    }
}

/// Provenance tag of an authoritative approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalVia {
    /// Single approver path
    Approver,
    /// Committee path
    Committee,
}

impl fmt::Display for ApprovalVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approver => "APPROVER",
            Self::Committee => "COMMITTEE",
        })
    }
}

/// An approval together with the path it came through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Approval {
    /// Granted by a single approver
    Direct(DirectApproval),
    /// Granted by a committee
    Committee(CommitteeApproval),
}

impl Approval {
    /// Provenance tag
    pub fn via(&self) -> ApprovalVia {
        match self {
            Self::Direct(_) => ApprovalVia::Approver,
            Self::Committee(_) => ApprovalVia::Committee,
        }
    }

    /// Approver identity
    pub fn approver_id(&self) -> &ActorId {
        match self {
            Self::Direct(a) => &a.approver_id,
            Self::Committee(a) => &a.approver_id,
        }
    }

    /// Approval time
    pub fn approved_at(&self) -> Option<Timestamp> {
        match self {
            Self::Direct(a) => a.approved_at,
            Self::Committee(a) => a.approved_at,
        }
    }

    /// Committee reference, only for committee approvals
    pub fn committee_id(&self) -> Option<&CommitteeId> {
        match self {
            Self::Direct(_) => None,
            Self::Committee(a) => Some(&a.committee_id),
        }
    }
}
