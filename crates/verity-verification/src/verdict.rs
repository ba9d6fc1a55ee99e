//! Verification verdicts
//!
//! Turns the stored facts about an issued letter into the public response.
//! Only three outcomes exist: valid, revoked, and a generic invalid that does
//! not say whether the document is unknown, unapproved or rejected.

use crate::reconcile::reconcile;
use serde::{Deserialize, Serialize};
use verity_core::{
    ActorId, ApprovalHistory, ApprovalVia, CommitteeId, Issuance, IssuingContext, Letter,
    LetterStatus, Timestamp, VersionNumber,
};

/// Message returned for every key that does not resolve to a verifiable document
pub const UNKNOWN_DOCUMENT_MESSAGE: &str = "Invalid or unknown document.";

/// Message returned for revoked documents
pub const REVOKED_MESSAGE: &str = "Document has been revoked.";

/// Everything needed to answer a verification lookup
#[derive(Debug, Clone)]
pub struct VerificationSnapshot {
    /// Letter as currently stored
    pub letter: Letter,
    /// Department display name
    pub department_name: Option<String>,
    /// Version the presented key refers to
    pub version_number: VersionNumber,
    /// Approval history of the letter
    pub approvals: ApprovalHistory,
    /// Issuances of the letter; the first one is reported
    pub issuances: Vec<Issuance>,
}

/// Public verdict label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// Approved or issued and untampered
    Valid,
    /// Withdrawn after approval or issuance
    Revoked,
    /// Unknown, malformed, unapproved or rejected
    Invalid,
}

/// Details disclosed about a verified document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDetails {
    /// Issuing authority
    pub context: IssuingContext,
    /// Department display name
    pub department: Option<String>,
    /// Letter status at lookup time
    pub status: LetterStatus,
    /// Issue time of the first issuance
    pub issued_at: Option<Timestamp>,
    /// Issuer of the first issuance
    pub issued_by: Option<ActorId>,
    /// Sequential reference number
    pub letter_number: Option<u64>,
    /// Approver of the authoritative approval
    pub approved_by: Option<ActorId>,
    /// Time of the authoritative approval
    pub approved_at: Option<Timestamp>,
    /// Path the authoritative approval took
    pub approved_via: Option<ApprovalVia>,
    /// Committee, when the committee path was authoritative
    pub committee_id: Option<CommitteeId>,
    /// Whether an issuance record exists
    pub issuance_exists: bool,
    /// Version the presented key refers to
    pub version_number: VersionNumber,
}

/// Response to a verification lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the document is currently genuine and in force
    pub valid: bool,
    /// Verdict label
    pub status: VerdictStatus,
    /// Human-readable explanation for negative verdicts
    pub message: Option<String>,
    /// Disclosed details, absent for the generic invalid verdict
    pub document_details: Option<DocumentDetails>,
}

impl VerificationResult {
    /// The generic negative verdict
    pub fn unknown() -> Self {
        Self {
            valid: false,
            status: VerdictStatus::Invalid,
            message: Some(UNKNOWN_DOCUMENT_MESSAGE.to_string()),
            document_details: None,
        }
    }

    /// Whether this is the generic negative verdict
    pub fn is_unknown(&self) -> bool {
        self.status == VerdictStatus::Invalid
    }
}

/// Build the verdict for a snapshot
pub fn build_verdict(snapshot: &VerificationSnapshot) -> VerificationResult {
    let letter = &snapshot.letter;
    let issuance = snapshot.issuances.first();

    let base = DocumentDetails {
        context: letter.context,
        department: snapshot.department_name.clone(),
        status: letter.status,
        issued_at: issuance.map(|i| i.issued_at),
        issued_by: issuance.map(|i| i.issued_by.clone()),
        letter_number: letter.letter_number,
        approved_by: None,
        approved_at: None,
        approved_via: None,
        committee_id: None,
        issuance_exists: false,
        version_number: snapshot.version_number,
    };

    match letter.status {
        LetterStatus::Revoked => VerificationResult {
            valid: false,
            status: VerdictStatus::Revoked,
            message: Some(REVOKED_MESSAGE.to_string()),
            document_details: Some(base),
        },
        LetterStatus::Approved | LetterStatus::Issued => {
            let approval = reconcile(&snapshot.approvals.direct, &snapshot.approvals.committee);
            let details = DocumentDetails {
                approved_by: approval.as_ref().map(|a| a.approver_id().clone()),
                approved_at: approval.as_ref().and_then(|a| a.approved_at()),
                approved_via: approval.as_ref().map(|a| a.via()),
                committee_id: approval.as_ref().and_then(|a| a.committee_id().cloned()),
                issuance_exists: issuance.is_some(),
                ..base
            };
            VerificationResult {
                valid: true,
                status: VerdictStatus::Valid,
                message: None,
                document_details: Some(details),
            }
        }
        LetterStatus::Draft | LetterStatus::Rejected => VerificationResult::unknown(),
    }
}
