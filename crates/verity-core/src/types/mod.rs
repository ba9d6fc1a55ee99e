//! Domain types shared by every Verity crate

pub mod actor;
pub mod approval;
pub mod audit;
pub mod identifiers;
pub mod issuance;
pub mod letter;
pub mod reference;

/// Wall-clock instant used on every record
pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub use actor::{Actor, Role};
pub use approval::{Approval, ApprovalHistory, ApprovalVia, CommitteeApproval, DirectApproval};
pub use audit::{AuditAction, AuditEntry};
pub use identifiers::{
    AcknowledgementId, ActorId, CommitteeId, DepartmentId, IssuanceId, LetterId, PrintRequestId,
    TagId, VerificationToken, VersionNumber,
};
pub use issuance::{
    Acknowledgement, Channel, Issuance, PrintJob, PrintRequest, PrintRequestStatus, RenderStatus,
    DEFAULT_PRINTER_ID,
};
pub use letter::{IssuingContext, Letter, LetterQuery, LetterStatus, LetterVersion};
pub use reference::{Committee, Department, Tag};
