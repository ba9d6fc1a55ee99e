//! Issuance and print control against the in-memory store

#![allow(clippy::unwrap_used)]

use assert_matches::assert_matches;
use std::sync::Arc;
use verity_core::effects::{CommitGuard, LetterMutation, LetterStore, RandomEffects, Write};
use verity_core::{
    content_digest, AuditAction, Channel, LetterId, LetterStatus, LetterVersion,
    PrintRequestStatus, VerityError, VersionNumber,
};
use verity_issuance::{IssuanceCoordinator, IssueCommand, PrintControl, PRINT_LIMIT_REACHED};
use verity_testkit::{approver, author, epoch, issuer, letter_fixture, test_effects, TestEffects};

async fn with_letter(id: &str, status: LetterStatus) -> Arc<TestEffects> {
    let effects = Arc::new(test_effects().await);
    let letter = letter_fixture(id, status);
    let first = LetterVersion {
        letter_id: letter.id.clone(),
        version_number: VersionNumber(1),
        content: letter.content.clone(),
        content_digest: content_digest(&letter.content),
        created_by: author().id,
        created_at: epoch(),
        verification_token: None,
    };
    effects
        .commit(
            CommitGuard::for_letter(letter.id.clone()).absent(),
            LetterMutation::new()
                .with(Write::InsertLetter(letter))
                .with(Write::AppendVersion(first)),
        )
        .await
        .unwrap();
    effects
}

async fn command(effects: &TestEffects, id: &str, max_prints: u32) -> IssueCommand {
    let letter_id = LetterId::new(id);
    let letter = effects.letter(&letter_id).await.unwrap().unwrap();
    let head = effects.latest_version(&letter_id).await.unwrap();
    let token = effects.verification_token().await;
    IssueCommand::prepare(&letter, head, issuer().id, Channel::Email, token, max_prints).unwrap()
}

#[tokio::test]
async fn issue_freezes_version_and_assigns_number() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());
    let cmd = command(&effects, "l-1", 1).await;

    let receipt = coordinator.issue(cmd.clone()).await.unwrap();
    assert!(!receipt.replayed);
    assert_eq!(receipt.letter_number, 1);
    assert_eq!(receipt.version_number, VersionNumber(2));
    assert_eq!(receipt.verification_token, cmd.token);

    let id = LetterId::new("l-1");
    let letter = effects.letter(&id).await.unwrap().unwrap();
    assert_eq!(letter.status, LetterStatus::Issued);
    assert_eq!(letter.letter_number, Some(1));

    let frozen = effects.version(&id, VersionNumber(2)).await.unwrap().unwrap();
    assert_eq!(frozen.verification_token, Some(cmd.token));
    assert_eq!(frozen.content, letter.content);

    let issuance = effects.issuance_for_letter(&id).await.unwrap().unwrap();
    assert_eq!(issuance.letter_number, 1);
    assert_eq!(issuance.fingerprint, cmd.fingerprint);

    let audit = effects.audit_log(&id).await.unwrap();
    assert_eq!(audit.last().unwrap().action, AuditAction::Issue);
}

#[tokio::test]
async fn second_issue_replays_the_first() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());

    let first = coordinator.issue(command(&effects, "l-1", 1).await).await.unwrap();
    let again = coordinator.issue(command(&effects, "l-1", 1).await).await.unwrap();

    assert!(again.replayed);
    assert_eq!(again.issuance_id, first.issuance_id);
    assert_eq!(again.verification_token, first.verification_token);
    assert_eq!(again.letter_number, first.letter_number);
    let id = LetterId::new("l-1");
    assert_eq!(effects.versions(&id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_issuers_agree_on_one_issuance() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());
    let left = command(&effects, "l-1", 1).await;
    let right = command(&effects, "l-1", 1).await;
    assert_ne!(left.token, right.token);

    let (a, b) = futures::join!(coordinator.issue(left), coordinator.issue(right));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.issuance_id, b.issuance_id);
    assert_eq!(a.verification_token, b.verification_token);
    assert!(a.replayed ^ b.replayed);
}

#[tokio::test]
async fn stale_head_is_a_conflict_without_writes() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());
    let mut cmd = command(&effects, "l-1", 1).await;

    let id = LetterId::new("l-1");
    let letter = effects.letter(&id).await.unwrap().unwrap();
    cmd.expected_version = VersionNumber(3);
    cmd.fingerprint = verity_core::fingerprint(
        &verity_core::FingerprintInput::for_letter(&letter, VersionNumber(3)),
    )
    .unwrap();

    assert_matches!(
        coordinator.issue(cmd).await,
        Err(VerityError::Conflict { .. })
    );
    assert!(effects.issuance_for_letter(&id).await.unwrap().is_none());
    assert_eq!(
        effects.letter(&id).await.unwrap().unwrap().status,
        LetterStatus::Approved
    );
}

#[tokio::test]
async fn print_issuance_records_its_print_job() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());
    let mut cmd = command(&effects, "l-1", 1).await.on_printer("front-desk");
    cmd.channel = Channel::Print;

    let receipt = coordinator.issue(cmd).await.unwrap();
    let jobs = effects.print_jobs(&receipt.issuance_id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].printer_id, "front-desk");
    assert_eq!(jobs[0].printed_by, issuer().id);

    let effects = with_letter("l-2", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());
    let receipt = coordinator
        .issue(command(&effects, "l-2", 1).await)
        .await
        .unwrap();
    assert!(effects
        .print_jobs(&receipt.issuance_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn command_prepared_before_an_edit_is_a_conflict() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());
    let cmd = command(&effects, "l-1", 1).await;
    assert_eq!(cmd.expected_version, VersionNumber(2));

    // The letter moves to version 2 with new content after the command was built.
    let id = LetterId::new("l-1");
    let mut edited = effects.letter(&id).await.unwrap().unwrap();
    edited.content = "Hello again".into();
    let second = LetterVersion {
        letter_id: id.clone(),
        version_number: VersionNumber(2),
        content: edited.content.clone(),
        content_digest: content_digest(&edited.content),
        created_by: author().id,
        created_at: epoch(),
        verification_token: None,
    };
    effects
        .commit(
            CommitGuard::for_letter(id.clone()).head(VersionNumber(1)),
            LetterMutation::new()
                .with(Write::UpdateLetter(edited))
                .with(Write::AppendVersion(second)),
        )
        .await
        .unwrap();

    let err = coordinator.issue(cmd).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.status_code(), 409);
    assert!(effects.issuance_for_letter(&id).await.unwrap().is_none());
    assert_eq!(effects.latest_version(&id).await.unwrap(), VersionNumber(2));
}

#[tokio::test]
async fn mismatched_fingerprint_is_rejected() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let coordinator = IssuanceCoordinator::new(effects.clone());
    let mut cmd = command(&effects, "l-1", 1).await;
    cmd.fingerprint = verity_core::Fingerprint::from_bytes([7; 32]);

    assert_matches!(coordinator.issue(cmd).await, Err(VerityError::Invalid { .. }));
    assert!(effects
        .issuance_for_letter(&LetterId::new("l-1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn only_approved_letters_issue() {
    for status in [LetterStatus::Draft, LetterStatus::Rejected, LetterStatus::Revoked] {
        let effects = with_letter("l-1", status).await;
        let coordinator = IssuanceCoordinator::new(effects.clone());
        let cmd = command(&effects, "l-1", 1).await;
        let err = coordinator.issue(cmd).await.unwrap_err();
        assert_matches!(err, VerityError::Invalid { ref message } if message.contains(status.as_str()));
    }
}

#[tokio::test]
async fn letter_numbers_are_sequential_across_letters() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let letter = letter_fixture("l-2", LetterStatus::Approved);
    let first = LetterVersion {
        letter_id: letter.id.clone(),
        version_number: VersionNumber(1),
        content: "Another body".into(),
        content_digest: content_digest("Another body"),
        created_by: author().id,
        created_at: epoch(),
        verification_token: None,
    };
    effects
        .commit(
            CommitGuard::for_letter(letter.id.clone()).absent(),
            LetterMutation::new()
                .with(Write::InsertLetter(verity_core::Letter {
                    content: "Another body".into(),
                    ..letter
                }))
                .with(Write::AppendVersion(first)),
        )
        .await
        .unwrap();

    let coordinator = IssuanceCoordinator::new(effects.clone());
    let one = coordinator.issue(command(&effects, "l-1", 1).await).await.unwrap();
    let two = coordinator.issue(command(&effects, "l-2", 1).await).await.unwrap();
    assert_eq!((one.letter_number, two.letter_number), (1, 2));
    assert_ne!(one.fingerprint, two.fingerprint);
}

#[tokio::test]
async fn print_limit_and_reprint_approval() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    IssuanceCoordinator::new(effects.clone())
        .issue(command(&effects, "l-1", 1).await)
        .await
        .unwrap();
    let control = PrintControl::new(effects.clone());
    let id = LetterId::new("l-1");

    let printed = control.print(&issuer().id, &id).await.unwrap();
    assert_eq!((printed.print_count, printed.max_prints), (1, 1));

    let err = control.print(&issuer().id, &id).await.unwrap_err();
    assert_matches!(err, VerityError::PermissionDenied { ref message } if message == PRINT_LIMIT_REACHED);

    assert_matches!(
        control.request_reprint(&author().id, &id, "  ").await,
        Err(VerityError::Invalid { .. })
    );
    let request = control
        .request_reprint(&author().id, &id, "Original was damaged")
        .await
        .unwrap();
    assert_eq!(request.status, PrintRequestStatus::Pending);

    let decided = control.approve_reprint(&approver().id, &request.id).await.unwrap();
    assert_eq!(decided.status, PrintRequestStatus::Approved);
    assert_eq!(decided.decided_by, Some(approver().id));

    let printed = control.print(&issuer().id, &id).await.unwrap();
    assert_eq!((printed.print_count, printed.max_prints), (2, 2));

    assert_matches!(
        control.approve_reprint(&approver().id, &request.id).await,
        Err(VerityError::Invalid { .. })
    );

    let actions: Vec<_> = effects
        .audit_log(&id)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Issue,
            AuditAction::Print,
            AuditAction::ReprintRequest,
            AuditAction::ReprintApprove,
            AuditAction::Print,
        ]
    );
}

#[tokio::test]
async fn rejected_reprint_keeps_the_limit() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    IssuanceCoordinator::new(effects.clone())
        .issue(command(&effects, "l-1", 0).await)
        .await
        .unwrap();
    let control = PrintControl::new(effects.clone());
    let id = LetterId::new("l-1");

    let request = control
        .request_reprint(&author().id, &id, "Need a copy")
        .await
        .unwrap();
    let decided = control.reject_reprint(&approver().id, &request.id).await.unwrap();
    assert_eq!(decided.status, PrintRequestStatus::Rejected);

    let issuance = effects.issuance_for_letter(&id).await.unwrap().unwrap();
    assert_eq!(issuance.max_prints, 0);
    assert_matches!(
        control.print(&issuer().id, &id).await,
        Err(VerityError::PermissionDenied { .. })
    );
}

#[tokio::test]
async fn printing_requires_an_issued_letter() {
    let effects = with_letter("l-1", LetterStatus::Approved).await;
    let control = PrintControl::new(effects);
    assert_matches!(
        control.print(&issuer().id, &LetterId::new("l-1")).await,
        Err(VerityError::Invalid { .. })
    );
    assert_matches!(
        control.print(&issuer().id, &LetterId::new("missing")).await,
        Err(VerityError::NotFound { .. })
    );
}
