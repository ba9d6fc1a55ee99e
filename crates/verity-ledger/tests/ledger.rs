//! Version ledger behavior against the in-memory store

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use std::sync::Arc;
use verity_core::effects::{CommitGuard, LetterMutation, LetterStore, Write};
use verity_core::{
    content_digest, ActorId, AuditAction, AuditEntry, LetterId, VerityError, VersionNumber,
};
use verity_effects::{MemoryLetterStore, TextRenderer, VerityEffectSystem};
use verity_ledger::{version_record, BrokenLink, VersionLedger};
use verity_testkit::{at, ControllableClock, FaultyStore, InterleavingStore, SeededRandom};

type Effects<S> = VerityEffectSystem<S, ControllableClock, SeededRandom, TextRenderer>;

fn effects<S>(store: S) -> Arc<Effects<S>> {
    Arc::new(VerityEffectSystem::new(
        store,
        ControllableClock::default(),
        SeededRandom::default(),
        TextRenderer::new(),
    ))
}

fn alice() -> ActorId {
    ActorId::new("alice")
}

#[tokio::test]
async fn sequential_records_are_gap_free() {
    let effects = effects(MemoryLetterStore::new());
    let ledger = VersionLedger::new(effects.clone(), 5);
    let id = LetterId::new("letter-1");

    let mut numbers = Vec::new();
    for body in ["first", "second", "third"] {
        let recorded = ledger.record_version(&id, body, &alice()).await.unwrap();
        assert_eq!(recorded.digest, content_digest(body));
        numbers.push(recorded.version);
    }
    assert_eq!(numbers, vec![VersionNumber(1), VersionNumber(2), VersionNumber(3)]);

    let history = ledger.history(&id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].content, "second");
    assert!(ledger.audit_history(&id).await.unwrap().is_intact());
}

#[tokio::test]
async fn letters_have_independent_sequences() {
    let effects = effects(MemoryLetterStore::new());
    let ledger = VersionLedger::new(effects, 5);

    let a = ledger
        .record_version(&LetterId::new("a"), "x", &alice())
        .await
        .unwrap();
    let b = ledger
        .record_version(&LetterId::new("b"), "x", &alice())
        .await
        .unwrap();
    assert_eq!(a.version, VersionNumber(1));
    assert_eq!(b.version, VersionNumber(1));
}

#[tokio::test]
async fn concurrent_records_from_same_head_yield_one_and_two() {
    let store = InterleavingStore::new(MemoryLetterStore::new(), 2);
    let effects = effects(store);
    let ledger = VersionLedger::new(effects.clone(), 5);
    let id = LetterId::new("race");

    let actor = alice();
    let (left, right) = futures::join!(
        ledger.record_version(&id, "left", &actor),
        ledger.record_version(&id, "right", &actor),
    );

    let mut numbers = vec![left.unwrap().version, right.unwrap().version];
    numbers.sort();
    assert_eq!(numbers, vec![VersionNumber(1), VersionNumber(2)]);
    assert!(ledger.audit_history(&id).await.unwrap().is_intact());
}

#[tokio::test]
async fn fetch_failure_is_reported_and_writes_nothing() {
    let store = FaultyStore::new(MemoryLetterStore::new());
    store.fail_reads(true);
    let effects = effects(store);
    let ledger = VersionLedger::new(effects.clone(), 5);
    let id = LetterId::new("letter-1");

    let err = ledger.record_version(&id, "body", &alice()).await.unwrap_err();
    assert_matches!(&err, VerityError::Storage { message } if message.starts_with("Failed to fetch versions: "));
    assert_eq!(effects.store().commit_attempts(), 0);
}

#[tokio::test]
async fn insert_failure_is_reported_and_leaves_no_partial_record() {
    let store = FaultyStore::new(MemoryLetterStore::new());
    let effects = effects(store);
    let ledger = VersionLedger::new(effects.clone(), 5);
    let id = LetterId::new("letter-1");
    ledger.record_version(&id, "v1", &alice()).await.unwrap();

    effects.store().fail_commits(true);
    let err = ledger.record_version(&id, "v2", &alice()).await.unwrap_err();
    assert_matches!(&err, VerityError::Storage { message } if message.starts_with("Failed to insert version: "));

    effects.store().fail_commits(false);
    let history = ledger.history(&id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "v1");
}

#[tokio::test]
async fn conflicts_are_retried_then_surfaced() {
    let store = FaultyStore::new(MemoryLetterStore::new());
    let effects = effects(store);
    let ledger = VersionLedger::new(effects.clone(), 3);
    let id = LetterId::new("letter-1");

    effects.store().force_conflicts(2);
    let recorded = ledger.record_version(&id, "eventually", &alice()).await.unwrap();
    assert_eq!(recorded.version, VersionNumber(1));
    assert_eq!(effects.store().commit_attempts(), 3);

    effects.store().force_conflicts(3);
    let err = ledger.record_version(&id, "never", &alice()).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(ledger.history(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn extra_writes_commit_with_the_version() {
    let effects = effects(MemoryLetterStore::new());
    let ledger = VersionLedger::new(effects.clone(), 5);
    let id = LetterId::new("letter-1");

    let recorded = ledger
        .record_with(CommitGuard::for_letter(id.clone()), "body", &alice(), |version| {
            LetterMutation::new().with(Write::Audit(
                AuditEntry::new(AuditAction::Update, id.clone(), alice(), at(0))
                    .with_metadata(serde_json::json!({ "version": version.version_number })),
            ))
        })
        .await
        .unwrap();

    let log = effects.audit_log(&id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].metadata["version"], recorded.version.value());
}

#[tokio::test]
async fn audit_detects_tampered_digest() {
    let effects = effects(MemoryLetterStore::new());
    let ledger = VersionLedger::new(effects.clone(), 5);
    let id = LetterId::new("letter-1");
    ledger.record_version(&id, "genuine", &alice()).await.unwrap();

    let mut forged = version_record(&id, VersionNumber(2), "forged", &alice(), at(5), None);
    forged.content_digest = content_digest("something else");
    effects
        .commit(
            CommitGuard::for_letter(id.clone()),
            LetterMutation::new().with(Write::AppendVersion(forged)),
        )
        .await
        .unwrap();

    let audit = ledger.audit_history(&id).await.unwrap();
    assert_eq!(audit.versions, 2);
    assert_eq!(
        audit.broken,
        Some(BrokenLink::DigestMismatch {
            version: VersionNumber(2)
        })
    );
}
