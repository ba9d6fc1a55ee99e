//! Issuance coordinator
//!
//! Issuing writes five things that must appear together or not at all: the
//! frozen version carrying the verification token, the ISSUED status, the
//! letter number, the issuance record and its audit entry. They go to the
//! store as one batch guarded by the version head the fingerprint was
//! computed against and by the APPROVED status. A PRINT issuance also
//! records its print job in that batch.
//!
//! Issuing is idempotent per letter. A letter that is already ISSUED, because
//! of an earlier call or a concurrent winner, answers with the stored
//! issuance instead of an error. A command prepared against an older head
//! is a conflict, checked before the fingerprint.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use verity_core::effects::{
    CommitGuard, LetterMutation, LetterStore, PhysicalTimeEffects, RandomEffects, Write,
};
use verity_core::fingerprint::{fingerprint, FingerprintInput};
use verity_core::{
    ActorId, AuditAction, AuditEntry, Channel, Fingerprint, Issuance, IssuanceId, Letter,
    LetterId, LetterStatus, PrintJob, RenderStatus, VerificationToken, VerityError,
    VerityResult, VersionNumber, DEFAULT_PRINTER_ID,
};
use verity_ledger::version_record;

/// Effects issuance needs
pub trait IssuanceEffects: LetterStore + PhysicalTimeEffects + RandomEffects + Send + Sync {}

impl<T> IssuanceEffects for T where
    T: LetterStore + PhysicalTimeEffects + RandomEffects + Send + Sync
{
}

/// Request to issue one letter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCommand {
    /// Letter to issue
    pub letter_id: LetterId,
    /// Issuer
    pub issuer: ActorId,
    /// Number the frozen version will get; the head must be one below it
    pub expected_version: VersionNumber,
    /// Fingerprint computed for `expected_version`
    pub fingerprint: Fingerprint,
    /// Delivery channel
    pub channel: Channel,
    /// Verification token to embed
    pub token: VerificationToken,
    /// Print limit of the new issuance
    pub max_prints: u32,
    /// Printer for a PRINT issuance; the default printer when unset
    pub printer_id: Option<String>,
}

impl IssueCommand {
    /// Command for issuing `letter` on top of version `head`
    pub fn prepare(
        letter: &Letter,
        head: VersionNumber,
        issuer: ActorId,
        channel: Channel,
        token: VerificationToken,
        max_prints: u32,
    ) -> VerityResult<Self> {
        let expected_version = head.next().ok_or_else(|| {
            VerityError::internal(format!("version numbers exhausted for letter {}", letter.id))
        })?;
        let fingerprint = fingerprint(&FingerprintInput::for_letter(letter, expected_version))?;
        Ok(Self {
            letter_id: letter.id.clone(),
            issuer,
            expected_version,
            fingerprint,
            channel,
            token,
            max_prints,
            printer_id: None,
        })
    }

    /// Send the PRINT issuance to `printer_id`
    pub fn on_printer(mut self, printer_id: impl Into<String>) -> Self {
        self.printer_id = Some(printer_id.into());
        self
    }
}

/// Result of an issue call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReceipt {
    /// Issuance record
    pub issuance_id: IssuanceId,
    /// Sequential reference number
    pub letter_number: u64,
    /// Token embedded in the verification URL
    pub verification_token: VerificationToken,
    /// Fingerprint printed on the document
    pub fingerprint: Fingerprint,
    /// Frozen version
    pub version_number: VersionNumber,
    /// Whether this call found an existing issuance instead of creating one
    pub replayed: bool,
}

impl IssueReceipt {
    fn replay(issuance: &Issuance) -> Self {
        Self {
            issuance_id: issuance.id,
            letter_number: issuance.letter_number,
            verification_token: issuance.verification_token,
            fingerprint: issuance.fingerprint,
            version_number: issuance.version_number,
            replayed: true,
        }
    }
}

/// Commits issuances atomically and idempotently
#[derive(Debug)]
pub struct IssuanceCoordinator<E> {
    effects: Arc<E>,
}

impl<E> Clone for IssuanceCoordinator<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
        }
    }
}

impl<E: IssuanceEffects> IssuanceCoordinator<E> {
    /// Create a coordinator
    pub fn new(effects: Arc<E>) -> Self {
        Self { effects }
    }

    /// Issue the letter named in `command`
    pub async fn issue(&self, command: IssueCommand) -> VerityResult<IssueReceipt> {
        let letter_id = &command.letter_id;
        let letter = self
            .effects
            .letter(letter_id)
            .await?
            .ok_or_else(|| VerityError::not_found(format!("Letter {letter_id} not found")))?;

        match letter.status {
            LetterStatus::Issued => return self.replay(letter_id).await,
            LetterStatus::Approved => {}
            other => {
                return Err(VerityError::invalid(format!(
                    "Letter must be APPROVED to issue (currently {other})"
                )))
            }
        }

        let head = command.expected_version.previous().ok_or_else(|| {
            VerityError::invalid("expected version must be at least 1")
        })?;
        let current = self.effects.latest_version(letter_id).await?;
        if current != head {
            warn!(letter_id = %letter_id, head = %current, expected = %head, "issue command is stale");
            return Err(VerityError::conflict(format!(
                "Letter {letter_id} is at {current}, command was prepared against {head}"
            )));
        }
        let recomputed =
            fingerprint(&FingerprintInput::for_letter(&letter, command.expected_version))?;
        if recomputed != command.fingerprint {
            return Err(VerityError::invalid(format!(
                "fingerprint does not match letter {letter_id} at {}",
                command.expected_version
            )));
        }

        let now = self.effects.now().await;
        let issuance_id = self.effects.issuance_id().await;

        let frozen = version_record(
            letter_id,
            command.expected_version,
            &letter.content,
            &command.issuer,
            now,
            Some(command.token),
        );
        let issued = Letter {
            status: LetterStatus::Issued,
            updated_at: now,
            ..letter
        };
        let issuance = Issuance {
            id: issuance_id,
            letter_id: letter_id.clone(),
            version_number: command.expected_version,
            issued_by: command.issuer.clone(),
            channel: command.channel,
            fingerprint: command.fingerprint,
            verification_token: command.token,
            letter_number: 0,
            issued_at: now,
            print_count: 0,
            max_prints: command.max_prints,
            render_status: RenderStatus::Pending,
        };
        let audit = AuditEntry::new(
            AuditAction::Issue,
            letter_id.clone(),
            command.issuer.clone(),
            now,
        )
        .with_metadata(json!({
            "issuance_id": issuance_id,
            "channel": command.channel,
            "version": command.expected_version,
            "fingerprint": command.fingerprint,
        }));

        let guard = CommitGuard::for_letter(letter_id.clone())
            .head(head)
            .status(LetterStatus::Approved);
        let mut mutation = LetterMutation::new()
            .with(Write::AppendVersion(frozen))
            .with(Write::UpdateLetter(issued))
            .with(Write::InsertIssuance(issuance))
            .with(Write::Audit(audit))
            .assigning_letter_number();
        if command.channel == Channel::Print {
            mutation.push(Write::RecordPrintJob(PrintJob {
                issuance_id,
                letter_id: letter_id.clone(),
                printer_id: command
                    .printer_id
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PRINTER_ID.to_string()),
                printed_by: command.issuer.clone(),
                printed_at: now,
            }));
        }

        match self.effects.commit(guard, mutation).await {
            Ok(receipt) => {
                let letter_number = receipt.letter_number.ok_or_else(|| {
                    VerityError::internal("store did not assign a letter number")
                })?;
                info!(
                    letter_id = %letter_id,
                    issuance_id = %issuance_id,
                    letter_number,
                    version = %command.expected_version,
                    channel = %command.channel,
                    "letter issued"
                );
                Ok(IssueReceipt {
                    issuance_id,
                    letter_number,
                    verification_token: command.token,
                    fingerprint: command.fingerprint,
                    version_number: command.expected_version,
                    replayed: false,
                })
            }
            Err(err) if err.is_conflict() => {
                if let Some(existing) = self.effects.issuance_for_letter(letter_id).await? {
                    info!(letter_id = %letter_id, "issuance raced; returning the winner");
                    return Ok(IssueReceipt::replay(&existing));
                }
                warn!(letter_id = %letter_id, error = %err, "issuance guard failed");
                Err(VerityError::conflict(format!(
                    "Letter {letter_id} changed while issuing: {err}"
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn replay(&self, letter_id: &LetterId) -> VerityResult<IssueReceipt> {
        let existing = self
            .effects
            .issuance_for_letter(letter_id)
            .await?
            .ok_or_else(|| {
                VerityError::internal(format!("Letter {letter_id} is ISSUED without an issuance"))
            })?;
        info!(letter_id = %letter_id, issuance_id = %existing.id, "issuance replayed");
        Ok(IssueReceipt::replay(&existing))
    }
}
