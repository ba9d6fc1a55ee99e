//! Request and response shapes of the letter service

use serde::{Deserialize, Serialize};
use serde_json::Value;
use verity_core::effects::RenderedDocument;
use verity_core::{CommitteeId, DepartmentId, IssuingContext, RenderStatus};
use verity_issuance::IssueReceipt;

/// Input for drafting a letter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLetter {
    /// Issuing context
    pub context: IssuingContext,
    /// Department, which must belong to `context`
    pub department_id: DepartmentId,
    /// Raw tag payload, normalized on the way in
    #[serde(default)]
    pub tag_ids: Value,
    /// Letter body
    pub content: String,
    /// Committee that must approve instead of a single approver
    #[serde(default)]
    pub committee_id: Option<CommitteeId>,
}

/// Changes to a draft
///
/// Absent optional fields keep their current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterEdit {
    /// New department
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    /// New raw tag payload
    #[serde(default)]
    pub tag_ids: Option<Value>,
    /// New body; recorded as the next version
    pub content: String,
    /// New committee assignment
    #[serde(default)]
    pub committee_id: Option<CommitteeId>,
}

/// Delivery acknowledgement captured for an issued letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAcknowledgement {
    /// External job or case reference
    pub job_reference: String,
    /// Location of the scanned signed copy
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Result of issuing a letter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOutcome {
    /// Committed issuance
    pub receipt: IssueReceipt,
    /// Public verification URL carrying the token
    pub verification_url: String,
    /// Render status after this call
    pub render_status: RenderStatus,
    /// Rendered document, when rendering ran and succeeded
    pub document: Option<RenderedDocument>,
    /// Whether `render_status` was written to the stored issuance
    ///
    /// When false the stored issuance still reads PENDING.
    pub render_recorded: bool,
}

impl IssueOutcome {
    /// Whether the issuance stands but its document could not be produced
    pub fn is_degraded(&self) -> bool {
        self.render_status == RenderStatus::Failed
    }
}
