//! Bundled effect system
//!
//! Wires one handler per interface and forwards each trait to it, so the
//! whole bundle satisfies `VerityEffects`. Handlers are type parameters; the
//! defaults are the production handlers from this crate.

use crate::{MemoryLetterStore, OsRandom, SystemClock, TextRenderer};
use async_trait::async_trait;
use uuid::Uuid;
use verity_core::effects::{
    CommitGuard, CommitReceipt, LetterMutation, LetterStore, PhysicalTimeEffects, RandomEffects,
    RenderEffects, RenderError, RenderRequest, RenderedDocument, StoreError,
};
use verity_core::{
    Acknowledgement, ApprovalHistory, AuditEntry, Committee, CommitteeId, Department,
    DepartmentId, Fingerprint, Issuance, IssuanceId, IssuingContext, Letter, LetterId,
    LetterQuery, LetterVersion, PrintJob, PrintRequest, PrintRequestId, Tag, Timestamp,
    VerificationToken, VersionNumber,
};

/// Effect bundle handed to the workflow service
#[derive(Debug, Clone, Default)]
pub struct VerityEffectSystem<
    S = MemoryLetterStore,
    C = SystemClock,
    R = OsRandom,
    D = TextRenderer,
> {
    store: S,
    clock: C,
    random: R,
    renderer: D,
}

impl VerityEffectSystem {
    /// Production handlers over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::default()
    }
}

impl<S, C, R, D> VerityEffectSystem<S, C, R, D> {
    /// Bundle explicit handlers
    pub fn new(store: S, clock: C, random: R, renderer: D) -> Self {
        Self {
            store,
            clock,
            random,
            renderer,
        }
    }

    /// Store handler
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Clock handler
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Random handler
    pub fn random(&self) -> &R {
        &self.random
    }

    /// Render handler
    pub fn renderer(&self) -> &D {
        &self.renderer
    }
}

#[async_trait]
impl<S, C, R, D> LetterStore for VerityEffectSystem<S, C, R, D>
where
    S: LetterStore,
    C: Send + Sync,
    R: Send + Sync,
    D: Send + Sync,
{
    async fn letter(&self, id: &LetterId) -> Result<Option<Letter>, StoreError> {
        self.store.letter(id).await
    }

    async fn letters(&self, query: &LetterQuery) -> Result<Vec<Letter>, StoreError> {
        self.store.letters(query).await
    }

    async fn latest_version(&self, id: &LetterId) -> Result<VersionNumber, StoreError> {
        self.store.latest_version(id).await
    }

    async fn version(
        &self,
        id: &LetterId,
        number: VersionNumber,
    ) -> Result<Option<LetterVersion>, StoreError> {
        self.store.version(id, number).await
    }

    async fn versions(&self, id: &LetterId) -> Result<Vec<LetterVersion>, StoreError> {
        self.store.versions(id).await
    }

    async fn approvals(&self, id: &LetterId) -> Result<ApprovalHistory, StoreError> {
        self.store.approvals(id).await
    }

    async fn issuance_for_letter(&self, id: &LetterId) -> Result<Option<Issuance>, StoreError> {
        self.store.issuance_for_letter(id).await
    }

    async fn issuance_by_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<Issuance>, StoreError> {
        self.store.issuance_by_token(token).await
    }

    async fn issuance_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Issuance>, StoreError> {
        self.store.issuance_by_fingerprint(fingerprint).await
    }

    async fn print_request(&self, id: &PrintRequestId) -> Result<Option<PrintRequest>, StoreError> {
        self.store.print_request(id).await
    }

    async fn department(&self, id: &DepartmentId) -> Result<Option<Department>, StoreError> {
        self.store.department(id).await
    }

    async fn print_jobs(&self, issuance: &IssuanceId) -> Result<Vec<PrintJob>, StoreError> {
        self.store.print_jobs(issuance).await
    }

    async fn acknowledgements(&self, id: &LetterId) -> Result<Vec<Acknowledgement>, StoreError> {
        self.store.acknowledgements(id).await
    }

    async fn departments(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Department>, StoreError> {
        self.store.departments(context).await
    }

    async fn tags(&self, context: Option<IssuingContext>) -> Result<Vec<Tag>, StoreError> {
        self.store.tags(context).await
    }

    async fn committees(
        &self,
        context: Option<IssuingContext>,
    ) -> Result<Vec<Committee>, StoreError> {
        self.store.committees(context).await
    }

    async fn committee(&self, id: &CommitteeId) -> Result<Option<Committee>, StoreError> {
        self.store.committee(id).await
    }

    async fn audit_log(&self, id: &LetterId) -> Result<Vec<AuditEntry>, StoreError> {
        self.store.audit_log(id).await
    }

    async fn commit(
        &self,
        guard: CommitGuard,
        mutation: LetterMutation,
    ) -> Result<CommitReceipt, StoreError> {
        self.store.commit(guard, mutation).await
    }
}

#[async_trait]
impl<S, C, R, D> PhysicalTimeEffects for VerityEffectSystem<S, C, R, D>
where
    S: Send + Sync,
    C: PhysicalTimeEffects,
    R: Send + Sync,
    D: Send + Sync,
{
    async fn now(&self) -> Timestamp {
        self.clock.now().await
    }
}

#[async_trait]
impl<S, C, R, D> RandomEffects for VerityEffectSystem<S, C, R, D>
where
    S: Send + Sync,
    C: Send + Sync,
    R: RandomEffects,
    D: Send + Sync,
{
    async fn random_uuid(&self) -> Uuid {
        self.random.random_uuid().await
    }
}

#[async_trait]
impl<S, C, R, D> RenderEffects for VerityEffectSystem<S, C, R, D>
where
    S: Send + Sync,
    C: Send + Sync,
    R: Send + Sync,
    D: RenderEffects,
{
    async fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, RenderError> {
        self.renderer.render(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_core::effects::VerityEffects;

    fn assert_effects<E: VerityEffects>(_: &E) {}

    #[tokio::test]
    async fn test_in_memory_bundle_is_complete() {
        let system = VerityEffectSystem::in_memory();
        assert_effects(&system);
        let id = LetterId::new("nothing");
        assert_eq!(system.latest_version(&id).await.unwrap(), VersionNumber::NONE);
    }
}
