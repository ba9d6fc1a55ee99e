//! Persistence port
//!
//! Every state change goes through [`LetterStore::commit`]: a batch of writes
//! applied atomically, but only if all preconditions of the [`CommitGuard`]
//! still hold when the store evaluates them inside its critical section.
//! Handlers must never apply part of a batch.

use crate::errors::VerityError;
use crate::hash::Fingerprint;
use crate::types::{
    Acknowledgement, ApprovalHistory, AuditEntry, Committee, CommitteeApproval, CommitteeId,
    Department, DepartmentId, DirectApproval, Issuance, IssuanceId, IssuingContext, Letter,
    LetterId, LetterQuery, LetterStatus, LetterVersion, PrintJob, PrintRequest, PrintRequestId,
    PrintRequestStatus, Tag, VerificationToken, VersionNumber,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port-level storage failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A guard precondition no longer holds
    #[error("precondition failed: {0}")]
    Conflict(String),
    /// A write referenced a record that does not exist
    #[error("record not found: {0}")]
    NotFound(String),
    /// A write would create a second record under a unique key
    #[error("duplicate record: {0}")]
    Duplicate(String),
    /// The backend could not serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this is a guard conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StoreError> for VerityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => VerityError::conflict(message),
            StoreError::NotFound(message) => VerityError::not_found(message),
            StoreError::Duplicate(message) => VerityError::conflict(message),
            StoreError::Unavailable(message) => VerityError::storage(message),
        }
    }
}

/// Condition the store checks before applying a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// No letter exists under the guarded id
    LetterAbsent,
    /// Highest stored version equals this number (`NONE` when there are none)
    Head(VersionNumber),
    /// Letter status is one of these
    StatusIn(Vec<LetterStatus>),
    /// Issuance print counters still equal these values
    PrintState {
        /// Guarded issuance
        issuance_id: IssuanceId,
        /// Print count observed by the caller
        print_count: u32,
        /// Print limit observed by the caller
        max_prints: u32,
    },
    /// Reprint request status still equals this value
    RequestStatus {
        /// Guarded request
        request_id: PrintRequestId,
        /// Status observed by the caller
        status: PrintRequestStatus,
    },
}

/// Preconditions for one commit, scoped to a letter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitGuard {
    /// Letter the batch belongs to
    pub letter_id: LetterId,
    /// Conditions evaluated atomically with the writes
    pub preconditions: Vec<Precondition>,
}

impl CommitGuard {
    /// Unconditional guard for `letter_id`
    pub fn for_letter(letter_id: LetterId) -> Self {
        Self {
            letter_id,
            preconditions: Vec::new(),
        }
    }

    /// Require that the letter does not exist yet
    pub fn absent(mut self) -> Self {
        self.preconditions.push(Precondition::LetterAbsent);
        self
    }

    /// Require the version head to be `head`
    pub fn head(mut self, head: VersionNumber) -> Self {
        self.preconditions.push(Precondition::Head(head));
        self
    }

    /// Require the letter to be in `status`
    pub fn status(self, status: LetterStatus) -> Self {
        self.status_in([status])
    }

    /// Require the letter to be in one of `statuses`
    pub fn status_in(mut self, statuses: impl IntoIterator<Item = LetterStatus>) -> Self {
        self.preconditions
            .push(Precondition::StatusIn(statuses.into_iter().collect()));
        self
    }

    /// Require the issuance counters observed in `issuance`
    pub fn print_state(mut self, issuance: &Issuance) -> Self {
        self.preconditions.push(Precondition::PrintState {
            issuance_id: issuance.id,
            print_count: issuance.print_count,
            max_prints: issuance.max_prints,
        });
        self
    }

    /// Require a reprint request status
    pub fn request_status(
        mut self,
        request_id: PrintRequestId,
        status: PrintRequestStatus,
    ) -> Self {
        self.preconditions
            .push(Precondition::RequestStatus { request_id, status });
        self
    }
}

/// Single write inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Write {
    /// Insert a new letter
    InsertLetter(Letter),
    /// Replace an existing letter
    UpdateLetter(Letter),
    /// Append the next version of a letter
    AppendVersion(LetterVersion),
    /// Append a direct approval
    AppendApproval(DirectApproval),
    /// Append a committee approval
    AppendCommitteeApproval(CommitteeApproval),
    /// Insert the letter's single issuance
    InsertIssuance(Issuance),
    /// Replace an existing issuance
    UpdateIssuance(Issuance),
    /// Insert or replace a reprint request
    PutPrintRequest(PrintRequest),
    /// Append a print job to its issuance
    RecordPrintJob(PrintJob),
    /// Append a delivery acknowledgement
    InsertAcknowledgement(Acknowledgement),
    /// Append an audit entry
    Audit(AuditEntry),
}

/// Batch of writes applied by one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LetterMutation {
    /// Writes in application order
    pub writes: Vec<Write>,
    /// Draw the next global letter number and stamp it on the letter and issuance writes
    pub assign_letter_number: bool,
}

impl LetterMutation {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a write
    pub fn with(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    /// Add a write in place
    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    /// Ask the store to assign a letter number
    pub fn assigning_letter_number(mut self) -> Self {
        self.assign_letter_number = true;
        self
    }

    /// Append another batch after this one
    pub fn extend(&mut self, other: LetterMutation) {
        self.writes.extend(other.writes);
        self.assign_letter_number |= other.assign_letter_number;
    }

    /// Whether the batch has no writes
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitReceipt {
    /// Letter number drawn for this commit, if one was requested
    pub letter_number: Option<u64>,
}

/// Transactional letter store
#[async_trait]
pub trait LetterStore: Send + Sync {
    /// Fetch a letter
    async fn letter(&self, id: &LetterId) -> Result<Option<Letter>, StoreError>;

    /// One page of letters, newest first
    async fn letters(&self, query: &LetterQuery) -> Result<Vec<Letter>, StoreError>;

    /// Highest stored version number, `VersionNumber::NONE` when there is none
    async fn latest_version(&self, id: &LetterId) -> Result<VersionNumber, StoreError>;

    /// One stored version
    async fn version(
        &self,
        id: &LetterId,
        number: VersionNumber,
    ) -> Result<Option<LetterVersion>, StoreError>;

    /// Every stored version in ascending order
    async fn versions(&self, id: &LetterId) -> Result<Vec<LetterVersion>, StoreError>;

    /// Both approval lists in insertion order
    async fn approvals(&self, id: &LetterId) -> Result<ApprovalHistory, StoreError>;

    /// Issuance of a letter
    async fn issuance_for_letter(&self, id: &LetterId) -> Result<Option<Issuance>, StoreError>;

    /// Issuance carrying a verification token
    async fn issuance_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Issuance>, StoreError>;

    /// Issuance carrying a fingerprint
    async fn issuance_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Issuance>, StoreError>;

    /// Reprint request
    async fn print_request(&self, id: &PrintRequestId) -> Result<Option<PrintRequest>, StoreError>;

    /// Print jobs of an issuance in dispatch order
    async fn print_jobs(&self, issuance: &IssuanceId) -> Result<Vec<PrintJob>, StoreError>;

    /// Delivery acknowledgements of a letter in capture order
    async fn acknowledgements(&self, id: &LetterId) -> Result<Vec<Acknowledgement>, StoreError>;

    /// Department reference data
    async fn department(&self, id: &DepartmentId) -> Result<Option<Department>, StoreError>;

    /// Departments, optionally of one context, ordered by id
    async fn departments(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Department>, StoreError>;

    /// Tags, optionally of one context, ordered by id
    async fn tags(&self, context: Option<IssuingContext>) -> Result<Vec<Tag>, StoreError>;

    /// Committee reference data
    async fn committee(&self, id: &CommitteeId) -> Result<Option<Committee>, StoreError>;

    /// Committees, optionally of one context, ordered by id
    async fn committees(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Committee>, StoreError>;

    /// Audit entries of a letter in commit order
    async fn audit_log(&self, id: &LetterId) -> Result<Vec<AuditEntry>, StoreError>;

    /// Apply `mutation` atomically if every precondition of `guard` holds
    async fn commit(
        &self,
        guard: CommitGuard,
        mutation: LetterMutation,
    ) -> Result<CommitReceipt, StoreError>;
}
