//! Verifier lookups against seeded store state

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use std::sync::Arc;
use verity_core::effects::{CommitGuard, LetterMutation, LetterStore, Write};
use verity_core::fingerprint::{fingerprint, FingerprintInput};
use verity_core::{
    content_digest, Channel, Issuance, IssuanceId, LetterStatus, LetterVersion, RenderStatus,
    VerificationToken, VerityError, VersionNumber,
};
use verity_effects::MemoryLetterStore;
use verity_testkit::{at, direct_approval, letter_fixture, seed_reference_data};
use verity_verification::{AccessGate, VerdictStatus, Verifier};

struct Seeded {
    store: Arc<MemoryLetterStore>,
    issuance: Issuance,
}

async fn seeded(status: LetterStatus) -> Seeded {
    let store = MemoryLetterStore::new();
    seed_reference_data(&store).await;

    let letter = letter_fixture("letter-123", status);
    let version = LetterVersion {
        letter_id: letter.id.clone(),
        version_number: VersionNumber(2),
        content: letter.content.clone(),
        content_digest: content_digest(&letter.content),
        created_by: "issuer".into(),
        created_at: at(500),
        verification_token: None,
    };
    let first = LetterVersion {
        version_number: VersionNumber(1),
        ..version.clone()
    };
    let fp = fingerprint(&FingerprintInput::for_letter(&letter, VersionNumber(2))).unwrap();
    let issuance = Issuance {
        id: IssuanceId::from_uuid(uuid::Uuid::from_u128(10)),
        letter_id: letter.id.clone(),
        version_number: VersionNumber(2),
        issued_by: "issuer".into(),
        channel: Channel::Email,
        fingerprint: fp,
        verification_token: VerificationToken::from_uuid(uuid::Uuid::from_u128(11)),
        letter_number: 0,
        issued_at: at(600),
        print_count: 0,
        max_prints: 1,
        render_status: RenderStatus::Ready,
    };

    store
        .commit(
            CommitGuard::for_letter(letter.id.clone()).absent(),
            LetterMutation::new()
                .with(Write::InsertLetter(letter.clone()))
                .with(Write::AppendVersion(first))
                .with(Write::AppendVersion(version))
                .with(Write::AppendApproval(direct_approval(
                    "letter-123",
                    "approver",
                    Some(at(100)),
                )))
                .with(Write::InsertIssuance(issuance.clone()))
                .assigning_letter_number(),
        )
        .await
        .unwrap();

    let issuance = store.issuance_for_letter(&letter.id).await.unwrap().unwrap();
    Seeded {
        store: Arc::new(store),
        issuance,
    }
}

#[tokio::test]
async fn fingerprint_and_token_resolve_to_the_same_verdict() {
    let seeded = seeded(LetterStatus::Issued).await;
    let verifier = Verifier::new(seeded.store.clone(), AccessGate::open());

    let by_fp = verifier
        .verify(None, &seeded.issuance.fingerprint.to_hex())
        .await
        .unwrap();
    let by_token = verifier
        .verify(None, &seeded.issuance.verification_token.to_string())
        .await
        .unwrap();

    assert!(by_fp.valid);
    assert_eq!(by_fp, by_token);
    let details = by_fp.document_details.unwrap();
    assert_eq!(details.version_number, VersionNumber(2));
    assert_eq!(details.letter_number, Some(1));
    assert_eq!(details.department.as_deref(), Some("Clinical Services"));
    assert_eq!(details.approved_by.unwrap().as_str(), "approver");
}

#[tokio::test]
async fn unknown_and_malformed_keys_are_indistinguishable() {
    let seeded = seeded(LetterStatus::Issued).await;
    let verifier = Verifier::new(seeded.store.clone(), AccessGate::open());

    let unknown_fp = verifier.verify(None, &"0".repeat(64)).await.unwrap();
    let unknown_token = verifier
        .verify(None, "00000000-0000-4000-8000-000000000000")
        .await
        .unwrap();
    let garbage = verifier.verify(None, "../etc/passwd").await.unwrap();

    assert_eq!(unknown_fp.status, VerdictStatus::Invalid);
    assert_eq!(unknown_fp, unknown_token);
    assert_eq!(unknown_fp, garbage);
}

#[tokio::test]
async fn revoked_letter_is_disclosed_as_revoked() {
    let seeded = seeded(LetterStatus::Revoked).await;
    let verifier = Verifier::new(seeded.store.clone(), AccessGate::open());

    let verdict = verifier
        .verify(None, &seeded.issuance.fingerprint.to_hex())
        .await
        .unwrap();
    assert!(!verdict.valid);
    assert_eq!(verdict.status, VerdictStatus::Revoked);
}

#[tokio::test]
async fn tampered_letter_fails_verification() {
    let seeded = seeded(LetterStatus::Issued).await;
    let mut letter = seeded
        .store
        .letter(&seeded.issuance.letter_id)
        .await
        .unwrap()
        .unwrap();
    letter.department_id = "dept-bcba".into();
    seeded
        .store
        .commit(
            CommitGuard::for_letter(letter.id.clone()),
            LetterMutation::new().with(Write::UpdateLetter(letter)),
        )
        .await
        .unwrap();

    let verifier = Verifier::new(seeded.store.clone(), AccessGate::open());
    let verdict = verifier
        .verify(None, &seeded.issuance.fingerprint.to_hex())
        .await
        .unwrap();
    assert_eq!(verdict.status, VerdictStatus::Invalid);
}

#[tokio::test]
async fn gate_runs_before_lookup() {
    let seeded = seeded(LetterStatus::Issued).await;
    let verifier = Verifier::new(seeded.store.clone(), AccessGate::with_key("s3cret"));
    let key = seeded.issuance.fingerprint.to_hex();

    assert_matches!(
        verifier.verify(None, &key).await,
        Err(VerityError::Unauthorized { .. })
    );
    assert_matches!(
        verifier.verify(Some("wrong"), "garbage").await,
        Err(VerityError::Unauthorized { .. })
    );
    assert!(verifier.verify(Some("s3cret"), &key).await.unwrap().valid);
}
