//! Fault injection
//!
//! Store wrappers that fail, conflict or interleave on demand, and a renderer
//! that always fails.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;
use verity_core::effects::{
    CommitGuard, CommitReceipt, LetterMutation, LetterStore, RenderEffects, RenderError,
    RenderRequest, RenderedDocument, StoreError,
};
use verity_core::{
    Acknowledgement, ApprovalHistory, AuditEntry, Committee, CommitteeId, Department,
    DepartmentId, Fingerprint, Issuance, IssuanceId, IssuingContext, Letter, LetterId,
    LetterQuery, LetterVersion, PrintJob, PrintRequest, PrintRequestId, Tag, VerificationToken,
    VersionNumber,
};

const UNLIMITED: usize = usize::MAX;

/// Store wrapper with switchable failures
#[derive(Debug, Clone)]
pub struct FaultyStore<S> {
    inner: S,
    fail_reads: Arc<AtomicBool>,
    fail_commits: Arc<AtomicBool>,
    forced_conflicts: Arc<AtomicUsize>,
    commit_budget: Arc<AtomicUsize>,
    commit_attempts: Arc<AtomicUsize>,
}

impl<S> FaultyStore<S> {
    /// Wrap a store; no faults are active initially
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_commits: Arc::new(AtomicBool::new(false)),
            forced_conflicts: Arc::new(AtomicUsize::new(0)),
            commit_budget: Arc::new(AtomicUsize::new(UNLIMITED)),
            commit_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make every read fail with `Unavailable`
    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    /// Make every commit fail with `Unavailable`
    pub fn fail_commits(&self, on: bool) {
        self.fail_commits.store(on, Ordering::SeqCst);
    }

    /// Reject the next `n` commits with a guard conflict
    pub fn force_conflicts(&self, n: usize) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Let the next `n` commits through, then fail every later one with `Unavailable`
    pub fn allow_commits(&self, n: usize) {
        self.commit_budget.store(n, Ordering::SeqCst);
    }

    /// Commits attempted through this wrapper, including rejected ones
    pub fn commit_attempts(&self) -> usize {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    fn read_gate(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: LetterStore> LetterStore for FaultyStore<S> {
    async fn letter(&self, id: &LetterId) -> Result<Option<Letter>, StoreError> {
        self.read_gate()?;
        self.inner.letter(id).await
    }

    async fn letters(&self, query: &LetterQuery) -> Result<Vec<Letter>, StoreError> {
        self.read_gate()?;
        self.inner.letters(query).await
    }

    async fn latest_version(&self, id: &LetterId) -> Result<VersionNumber, StoreError> {
        self.read_gate()?;
        self.inner.latest_version(id).await
    }

    async fn version(
        &self,
        id: &LetterId,
        number: VersionNumber,
    ) -> Result<Option<LetterVersion>, StoreError> {
        self.read_gate()?;
        self.inner.version(id, number).await
    }

    async fn versions(&self, id: &LetterId) -> Result<Vec<LetterVersion>, StoreError> {
        self.read_gate()?;
        self.inner.versions(id).await
    }

    async fn approvals(&self, id: &LetterId) -> Result<ApprovalHistory, StoreError> {
        self.read_gate()?;
        self.inner.approvals(id).await
    }

    async fn issuance_for_letter(&self, id: &LetterId) -> Result<Option<Issuance>, StoreError> {
        self.read_gate()?;
        self.inner.issuance_for_letter(id).await
    }

    async fn issuance_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Issuance>, StoreError> {
        self.read_gate()?;
        self.inner.issuance_by_token(token).await
    }

    async fn issuance_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Issuance>, StoreError> {
        self.read_gate()?;
        self.inner.issuance_by_fingerprint(fingerprint).await
    }

    async fn print_request(&self, id: &PrintRequestId) -> Result<Option<PrintRequest>, StoreError> {
        self.read_gate()?;
        self.inner.print_request(id).await
    }

    async fn department(&self, id: &DepartmentId) -> Result<Option<Department>, StoreError> {
        self.read_gate()?;
        self.inner.department(id).await
    }

    async fn print_jobs(&self, issuance: &IssuanceId) -> Result<Vec<PrintJob>, StoreError> {
        self.read_gate()?;
        self.inner.print_jobs(issuance).await
    }

    async fn acknowledgements(&self, id: &LetterId) -> Result<Vec<Acknowledgement>, StoreError> {
        self.read_gate()?;
        self.inner.acknowledgements(id).await
    }

    async fn departments(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Department>, StoreError> {
        self.read_gate()?;
        self.inner.departments(context).await
    }

    async fn tags(&self, context: Option<IssuingContext>) -> Result<Vec<Tag>, StoreError> {
        self.read_gate()?;
        self.inner.tags(context).await
    }

    async fn committees(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Committee>, StoreError> {
        self.read_gate()?;
        self.inner.committees(context).await
    }

    async fn committee(&self, id: &CommitteeId) -> Result<Option<Committee>, StoreError> {
        self.read_gate()?;
        self.inner.committee(id).await
    }

    async fn audit_log(&self, id: &LetterId) -> Result<Vec<AuditEntry>, StoreError> {
        self.read_gate()?;
        self.inner.audit_log(id).await
    }

    async fn commit(
        &self,
        guard: CommitGuard,
        mutation: LetterMutation,
    ) -> Result<CommitReceipt, StoreError> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        let budgeted = self
            .commit_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                UNLIMITED => Some(n),
                n => n.checked_sub(1),
            });
        if budgeted.is_err() {
            return Err(StoreError::Unavailable("commit budget exhausted".into()));
        }
        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if forced.is_ok() {
            return Err(StoreError::Conflict("injected conflict".into()));
        }
        self.inner.commit(guard, mutation).await
    }
}

/// Store wrapper that makes concurrent callers observe the same head
///
/// The first `parties` calls to `latest_version` wait on a shared barrier
/// after reading, so every party reads before any of them commits.
#[derive(Debug, Clone)]
pub struct InterleavingStore<S> {
    inner: S,
    barrier: Arc<Barrier>,
    pending: Arc<AtomicUsize>,
}

impl<S> InterleavingStore<S> {
    /// Synchronize the first head reads of `parties` callers
    pub fn new(inner: S, parties: usize) -> Self {
        Self {
            inner,
            barrier: Arc::new(Barrier::new(parties)),
            pending: Arc::new(AtomicUsize::new(parties)),
        }
    }

    /// Wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LetterStore> LetterStore for InterleavingStore<S> {
    async fn letter(&self, id: &LetterId) -> Result<Option<Letter>, StoreError> {
        self.inner.letter(id).await
    }

    async fn letters(&self, query: &LetterQuery) -> Result<Vec<Letter>, StoreError> {
        self.inner.letters(query).await
    }

    async fn latest_version(&self, id: &LetterId) -> Result<VersionNumber, StoreError> {
        let head = self.inner.latest_version(id).await?;
        let synchronized = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if synchronized {
            self.barrier.wait().await;
        }
        Ok(head)
    }

    async fn version(
        &self,
        id: &LetterId,
        number: VersionNumber,
    ) -> Result<Option<LetterVersion>, StoreError> {
        self.inner.version(id, number).await
    }

    async fn versions(&self, id: &LetterId) -> Result<Vec<LetterVersion>, StoreError> {
        self.inner.versions(id).await
    }

    async fn approvals(&self, id: &LetterId) -> Result<ApprovalHistory, StoreError> {
        self.inner.approvals(id).await
    }

    async fn issuance_for_letter(&self, id: &LetterId) -> Result<Option<Issuance>, StoreError> {
        self.inner.issuance_for_letter(id).await
    }

    async fn issuance_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Issuance>, StoreError> {
        self.inner.issuance_by_token(token).await
    }

    async fn issuance_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Issuance>, StoreError> {
        self.inner.issuance_by_fingerprint(fingerprint).await
    }

    async fn print_request(&self, id: &PrintRequestId) -> Result<Option<PrintRequest>, StoreError> {
        self.inner.print_request(id).await
    }

    async fn department(&self, id: &DepartmentId) -> Result<Option<Department>, StoreError> {
        self.inner.department(id).await
    }

    async fn print_jobs(&self, issuance: &IssuanceId) -> Result<Vec<PrintJob>, StoreError> {
        self.inner.print_jobs(issuance).await
    }

    async fn acknowledgements(&self, id: &LetterId) -> Result<Vec<Acknowledgement>, StoreError> {
        self.inner.acknowledgements(id).await
    }

    async fn departments(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Department>, StoreError> {
        self.inner.departments(context).await
    }

    async fn tags(&self, context: Option<IssuingContext>) -> Result<Vec<Tag>, StoreError> {
        self.inner.tags(context).await
    }

    async fn committees(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Committee>, StoreError> {
        self.inner.committees(context).await
    }

    async fn committee(&self, id: &CommitteeId) -> Result<Option<Committee>, StoreError> {
        self.inner.committee(id).await
    }

    async fn audit_log(&self, id: &LetterId) -> Result<Vec<AuditEntry>, StoreError> {
        self.inner.audit_log(id).await
    }

    async fn commit(
        &self,
        guard: CommitGuard,
        mutation: LetterMutation,
    ) -> Result<CommitReceipt, StoreError> {
        self.inner.commit(guard, mutation).await
    }
}

/// Renderer that always fails
#[derive(Debug, Clone, Default)]
pub struct FailingRenderer {
    reason: String,
}

impl FailingRenderer {
    /// Fail with `reason`
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RenderEffects for FailingRenderer {
    async fn render(&self, _request: &RenderRequest) -> Result<RenderedDocument, RenderError> {
        Err(RenderError::new(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use verity_effects::MemoryLetterStore;

    #[tokio::test]
    async fn test_forced_conflicts_are_consumed() {
        let store = FaultyStore::new(MemoryLetterStore::new());
        store.force_conflicts(1);
        let guard = CommitGuard::for_letter(LetterId::new("l"));

        let first = store.commit(guard.clone(), LetterMutation::new()).await;
        assert_matches!(first, Err(StoreError::Conflict(_)));
        assert!(store.commit(guard, LetterMutation::new()).await.is_ok());
        assert_eq!(store.commit_attempts(), 2);
    }

    #[tokio::test]
    async fn test_commit_budget_runs_out() {
        let store = FaultyStore::new(MemoryLetterStore::new());
        store.allow_commits(1);
        let guard = CommitGuard::for_letter(LetterId::new("l"));

        assert!(store.commit(guard.clone(), LetterMutation::new()).await.is_ok());
        assert_matches!(
            store.commit(guard, LetterMutation::new()).await,
            Err(StoreError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn test_read_failures_toggle() {
        let store = FaultyStore::new(MemoryLetterStore::new());
        store.fail_reads(true);
        let id = LetterId::new("l");
        assert_matches!(store.letter(&id).await, Err(StoreError::Unavailable(_)));
        store.fail_reads(false);
        assert_matches!(store.letter(&id).await, Ok(None));
    }
}
