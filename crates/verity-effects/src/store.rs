//! In-memory transactional letter store
//!
//! All state sits behind one `async_lock::RwLock`. A commit takes the write
//! lock, evaluates the guard, applies the batch to a staged copy and swaps it
//! in only when every write succeeded, so readers never observe half a batch.

use async_lock::RwLock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use verity_core::effects::{
    CommitGuard, CommitReceipt, LetterMutation, LetterStore, Precondition, StoreError, Write,
};
use verity_core::{
    Acknowledgement, ApprovalHistory, AuditEntry, Committee, CommitteeApproval, CommitteeId,
    Department, DepartmentId, DirectApproval, Fingerprint, Issuance, IssuanceId, IssuingContext,
    Letter, LetterId, LetterQuery, LetterVersion, PrintJob, PrintRequest, PrintRequestId, Tag,
    TagId, VerificationToken, VersionNumber,
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    letters: HashMap<LetterId, Letter>,
    versions: HashMap<LetterId, Vec<LetterVersion>>,
    direct_approvals: HashMap<LetterId, Vec<DirectApproval>>,
    committee_approvals: HashMap<LetterId, Vec<CommitteeApproval>>,
    issuances: HashMap<LetterId, Issuance>,
    print_requests: HashMap<PrintRequestId, PrintRequest>,
    print_jobs: HashMap<IssuanceId, Vec<PrintJob>>,
    acknowledgements: HashMap<LetterId, Vec<Acknowledgement>>,
    departments: HashMap<DepartmentId, Department>,
    tags: HashMap<TagId, Tag>,
    committees: HashMap<CommitteeId, Committee>,
    audit: HashMap<LetterId, Vec<AuditEntry>>,
    last_letter_number: u64,
}

impl StoreState {
    fn head(&self, id: &LetterId) -> VersionNumber {
        self.versions
            .get(id)
            .and_then(|versions| versions.last())
            .map(|version| version.version_number)
            .unwrap_or(VersionNumber::NONE)
    }

    fn check(&self, guard: &CommitGuard) -> Result<(), StoreError> {
        let id = &guard.letter_id;
        for precondition in &guard.preconditions {
            match precondition {
                Precondition::LetterAbsent => {
                    if self.letters.contains_key(id) {
                        return Err(StoreError::Conflict(format!("letter {id} already exists")));
                    }
                }
                Precondition::Head(expected) => {
                    let head = self.head(id);
                    if head != *expected {
                        return Err(StoreError::Conflict(format!(
                            "letter {id} head is {head}, expected {expected}"
                        )));
                    }
                }
                Precondition::StatusIn(allowed) => {
                    let letter = self
                        .letters
                        .get(id)
                        .ok_or_else(|| StoreError::NotFound(format!("letter {id}")))?;
                    if !allowed.contains(&letter.status) {
                        return Err(StoreError::Conflict(format!(
                            "letter {id} is {}",
                            letter.status
                        )));
                    }
                }
                Precondition::PrintState {
                    issuance_id,
                    print_count,
                    max_prints,
                } => {
                    let issuance = self
                        .issuances
                        .get(id)
                        .filter(|issuance| issuance.id == *issuance_id)
                        .ok_or_else(|| StoreError::NotFound(format!("issuance {issuance_id}")))?;
                    if issuance.print_count != *print_count || issuance.max_prints != *max_prints {
                        return Err(StoreError::Conflict(format!(
                            "issuance {issuance_id} printed {}/{}, expected {print_count}/{max_prints}",
                            issuance.print_count, issuance.max_prints
                        )));
                    }
                }
                Precondition::RequestStatus { request_id, status } => {
                    let request = self.print_requests.get(request_id).ok_or_else(|| {
                        StoreError::NotFound(format!("print request {request_id}"))
                    })?;
                    if request.status != *status {
                        return Err(StoreError::Conflict(format!(
                            "print request {request_id} is {:?}",
                            request.status
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, write: Write, letter_number: Option<u64>) -> Result<(), StoreError> {
        match write {
            Write::InsertLetter(mut letter) => {
                if self.letters.contains_key(&letter.id) {
                    return Err(StoreError::Duplicate(format!("letter {}", letter.id)));
                }
                if letter_number.is_some() {
                    letter.letter_number = letter_number;
                }
                self.letters.insert(letter.id.clone(), letter);
            }
            Write::UpdateLetter(mut letter) => {
                if !self.letters.contains_key(&letter.id) {
                    return Err(StoreError::NotFound(format!("letter {}", letter.id)));
                }
                if letter_number.is_some() {
                    letter.letter_number = letter_number;
                }
                self.letters.insert(letter.id.clone(), letter);
            }
            Write::AppendVersion(version) => {
                let head = self.head(&version.letter_id);
                if head.next() != Some(version.version_number) {
                    return Err(StoreError::Conflict(format!(
                        "version {} does not follow head {head} of letter {}",
                        version.version_number, version.letter_id
                    )));
                }
                self.versions
                    .entry(version.letter_id.clone())
                    .or_default()
                    .push(version);
            }
            Write::AppendApproval(approval) => {
                self.direct_approvals
                    .entry(approval.letter_id.clone())
                    .or_default()
                    .push(approval);
            }
            Write::AppendCommitteeApproval(approval) => {
                self.committee_approvals
                    .entry(approval.letter_id.clone())
                    .or_default()
                    .push(approval);
            }
            Write::InsertIssuance(mut issuance) => {
                if self.issuances.contains_key(&issuance.letter_id) {
                    return Err(StoreError::Duplicate(format!(
                        "issuance for letter {}",
                        issuance.letter_id
                    )));
                }
                if self.issuances.values().any(|existing| {
                    existing.verification_token == issuance.verification_token
                        || existing.fingerprint == issuance.fingerprint
                }) {
                    return Err(StoreError::Duplicate(format!(
                        "verification key of issuance {}",
                        issuance.id
                    )));
                }
                if let Some(number) = letter_number {
                    issuance.letter_number = number;
                }
                self.issuances.insert(issuance.letter_id.clone(), issuance);
            }
            Write::UpdateIssuance(issuance) => {
                match self.issuances.get_mut(&issuance.letter_id) {
                    Some(existing) if existing.id == issuance.id => *existing = issuance,
                    _ => return Err(StoreError::NotFound(format!("issuance {}", issuance.id))),
                }
            }
            Write::PutPrintRequest(request) => {
                self.print_requests.insert(request.id, request);
            }
            Write::RecordPrintJob(job) => {
                let known = self
                    .issuances
                    .get(&job.letter_id)
                    .is_some_and(|issuance| issuance.id == job.issuance_id);
                if !known {
                    return Err(StoreError::NotFound(format!("issuance {}", job.issuance_id)));
                }
                self.print_jobs.entry(job.issuance_id).or_default().push(job);
            }
            Write::InsertAcknowledgement(acknowledgement) => {
                if !self.letters.contains_key(&acknowledgement.letter_id) {
                    return Err(StoreError::NotFound(format!(
                        "letter {}",
                        acknowledgement.letter_id
                    )));
                }
                self.acknowledgements
                    .entry(acknowledgement.letter_id.clone())
                    .or_default()
                    .push(acknowledgement);
            }
            Write::Audit(entry) => {
                self.audit
                    .entry(entry.letter_id.clone())
                    .or_default()
                    .push(entry);
            }
        }
        Ok(())
    }
}

/// In-memory [`LetterStore`]
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLetterStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryLetterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a department
    pub async fn insert_department(&self, department: Department) {
        let mut state = self.state.write().await;
        state.departments.insert(department.id.clone(), department);
    }

    /// Register a committee
    pub async fn insert_committee(&self, committee: Committee) {
        let mut state = self.state.write().await;
        state.committees.insert(committee.id.clone(), committee);
    }

    /// Register a tag
    pub async fn insert_tag(&self, tag: Tag) {
        let mut state = self.state.write().await;
        state.tags.insert(tag.id.clone(), tag);
    }
}

fn in_context<'a, T, K: Ord>(
    records: impl Iterator<Item = &'a T>,
    context: Option<IssuingContext>,
    context_of: impl Fn(&T) -> IssuingContext,
    key: impl Fn(&T) -> K,
) -> Vec<T>
where
    T: Clone + 'a,
{
    let mut selected: Vec<T> = records
        .filter(|record| context.map_or(true, |context| context_of(record) == context))
        .cloned()
        .collect();
    selected.sort_by_key(key);
    selected
}

#[async_trait]
impl LetterStore for MemoryLetterStore {
    async fn letter(&self, id: &LetterId) -> Result<Option<Letter>, StoreError> {
        Ok(self.state.read().await.letters.get(id).cloned())
    }

    async fn letters(&self, query: &LetterQuery) -> Result<Vec<Letter>, StoreError> {
        let state = self.state.read().await;
        let mut letters: Vec<&Letter> = state
            .letters
            .values()
            .filter(|letter| query.matches(letter))
            .collect();
        letters.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(letters
            .into_iter()
            .skip(query.offset())
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn latest_version(&self, id: &LetterId) -> Result<VersionNumber, StoreError> {
        Ok(self.state.read().await.head(id))
    }

    async fn version(
        &self,
        id: &LetterId,
        number: VersionNumber,
    ) -> Result<Option<LetterVersion>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .get(id)
            .and_then(|versions| versions.iter().find(|v| v.version_number == number))
            .cloned())
    }

    async fn versions(&self, id: &LetterId) -> Result<Vec<LetterVersion>, StoreError> {
        let state = self.state.read().await;
        Ok(state.versions.get(id).cloned().unwrap_or_default())
    }

    async fn approvals(&self, id: &LetterId) -> Result<ApprovalHistory, StoreError> {
        let state = self.state.read().await;
        Ok(ApprovalHistory {
            direct: state.direct_approvals.get(id).cloned().unwrap_or_default(),
            committee: state.committee_approvals.get(id).cloned().unwrap_or_default(),
        })
    }

    async fn issuance_for_letter(&self, id: &LetterId) -> Result<Option<Issuance>, StoreError> {
        Ok(self.state.read().await.issuances.get(id).cloned())
    }

    async fn issuance_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Issuance>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .issuances
            .values()
            .find(|issuance| issuance.verification_token == *token)
            .cloned())
    }

    async fn issuance_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Issuance>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .issuances
            .values()
            .find(|issuance| issuance.fingerprint == *fingerprint)
            .cloned())
    }

    async fn print_request(&self, id: &PrintRequestId) -> Result<Option<PrintRequest>, StoreError> {
        Ok(self.state.read().await.print_requests.get(id).cloned())
    }

    async fn print_jobs(&self, issuance: &IssuanceId) -> Result<Vec<PrintJob>, StoreError> {
        let state = self.state.read().await;
        Ok(state.print_jobs.get(issuance).cloned().unwrap_or_default())
    }

    async fn acknowledgements(&self, id: &LetterId) -> Result<Vec<Acknowledgement>, StoreError> {
        let state = self.state.read().await;
        Ok(state.acknowledgements.get(id).cloned().unwrap_or_default())
    }

    async fn department(&self, id: &DepartmentId) -> Result<Option<Department>, StoreError> {
        Ok(self.state.read().await.departments.get(id).cloned())
    }

    async fn departments(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Department>, StoreError> {
        let state = self.state.read().await;
        Ok(in_context(
            state.departments.values(),
            context,
            |department| department.context,
            |department| department.id.clone(),
        ))
    }

    async fn tags(&self, context: Option<IssuingContext>) -> Result<Vec<Tag>, StoreError> {
        let state = self.state.read().await;
        Ok(in_context(
            state.tags.values(),
            context,
            |tag| tag.context,
            |tag| tag.id.clone(),
        ))
    }

    async fn committee(&self, id: &CommitteeId) -> Result<Option<Committee>, StoreError> {
        Ok(self.state.read().await.committees.get(id).cloned())
    }

    async fn committees(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Committee>, StoreError> {
        let state = self.state.read().await;
        Ok(in_context(
            state.committees.values(),
            context,
            |committee| committee.context,
            |committee| committee.id.clone(),
        ))
    }

    async fn audit_log(&self, id: &LetterId) -> Result<Vec<AuditEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state.audit.get(id).cloned().unwrap_or_default())
    }

    async fn commit(
        &self,
        guard: CommitGuard,
        mutation: LetterMutation,
    ) -> Result<CommitReceipt, StoreError> {
        let mut state = self.state.write().await;
        state.check(&guard)?;

        let mut staged = state.clone();
        let letter_number = if mutation.assign_letter_number {
            let next = staged
                .last_letter_number
                .checked_add(1)
                .ok_or_else(|| StoreError::Unavailable("letter numbers exhausted".into()))?;
            staged.last_letter_number = next;
            Some(next)
        } else {
            None
        };

        let writes = mutation.writes.len();
        for write in mutation.writes {
            staged.apply(write, letter_number)?;
        }
        *state = staged;

        tracing::trace!(letter_id = %guard.letter_id, writes, "committed batch");
        Ok(CommitReceipt { letter_number })
    }
}
