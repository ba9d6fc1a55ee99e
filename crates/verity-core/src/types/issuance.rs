//! Issuance and print-control records

use super::identifiers::{
    AcknowledgementId, ActorId, IssuanceId, LetterId, PrintRequestId, VerificationToken,
    VersionNumber,
};
use super::Timestamp;
use crate::hash::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery channel for an issued letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    /// Printed and handed over
    Print,
    /// Sent electronically
    Email,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Print => "PRINT",
            Self::Email => "EMAIL",
        })
    }
}

/// State of the rendered document attached to an issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderStatus {
    /// Issuance committed, rendering not yet attempted
    Pending,
    /// Document rendered
    Ready,
    /// Rendering failed after the issuance was committed
    Failed,
}

/// Record of a letter being finalized and handed out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuance {
    /// Issuance identifier
    pub id: IssuanceId,
    /// Issued letter
    pub letter_id: LetterId,
    /// Version frozen by this issuance
    pub version_number: VersionNumber,
    /// Issuer
    pub issued_by: ActorId,
    /// Delivery channel
    pub channel: Channel,
    /// Structural fingerprint at issuance time
    pub fingerprint: Fingerprint,
    /// Token embedded in the verification URL
    pub verification_token: VerificationToken,
    /// Sequential reference number, assigned by the store on commit
    pub letter_number: u64,
    /// Issue time
    pub issued_at: Timestamp,
    /// Copies printed so far
    pub print_count: u32,
    /// Copies allowed before a reprint approval is required
    pub max_prints: u32,
    /// Rendered document state
    pub render_status: RenderStatus,
}

impl Issuance {
    /// Whether another copy may be printed without approval
    pub fn can_print(&self) -> bool {
        self.print_count < self.max_prints
    }
}

/// Decision state of a reprint request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintRequestStatus {
    /// Awaiting a decision
    Pending,
    /// Granted; the print limit was raised by one
    Approved,
    /// Declined
    Rejected,
}

/// Request to print beyond the current limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintRequest {
    /// Request identifier
    pub id: PrintRequestId,
    /// Issuance the request is about
    pub issuance_id: IssuanceId,
    /// Letter the issuance belongs to
    pub letter_id: LetterId,
    /// Requester
    pub requested_by: ActorId,
    /// Justification
    pub reason: String,
    /// Decision state
    pub status: PrintRequestStatus,
    /// Submission time
    pub created_at: Timestamp,
    /// Approver or rejecter
    pub decided_by: Option<ActorId>,
    /// Decision time
    pub decided_at: Option<Timestamp>,
}

/// Printer used when a print job names none
pub const DEFAULT_PRINTER_ID: &str = "DEFAULT";

/// Physical print job sent when a letter is issued on the PRINT channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    /// Issuance the job printed
    pub issuance_id: IssuanceId,
    /// Letter the issuance belongs to
    pub letter_id: LetterId,
    /// Printer the job went to
    pub printer_id: String,
    /// Actor who sent the job
    pub printed_by: ActorId,
    /// Dispatch time
    pub printed_at: Timestamp,
}

/// Proof that an issued letter reached its recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Acknowledgement identifier
    pub id: AcknowledgementId,
    /// Acknowledged letter
    pub letter_id: LetterId,
    /// External job or case reference the delivery belongs to
    pub job_reference: String,
    /// Location of the scanned signed copy
    pub file_url: Option<String>,
    /// Actor who captured the acknowledgement
    pub captured_by: ActorId,
    /// Capture time
    pub captured_at: Timestamp,
}
