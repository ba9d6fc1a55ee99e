//! Print limits and reprint requests
//!
//! An issuance starts with a print limit. Each print bumps the counter under a
//! guard pinning the counters the caller saw, so two concurrent prints cannot
//! both take the last slot. An approved reprint request raises the limit by one.

use crate::coordinator::IssuanceEffects;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use verity_core::effects::{CommitGuard, LetterMutation, Write};
use verity_core::{
    ActorId, AuditAction, AuditEntry, Issuance, IssuanceId, LetterId, LetterStatus,
    PrintRequest, PrintRequestId, PrintRequestStatus, VerityError, VerityResult,
};

/// Message returned once an issuance has used up its prints
pub const PRINT_LIMIT_REACHED: &str = "Print limit reached";

/// Counters after a successful print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrintOutcome {
    /// Printed issuance
    pub issuance_id: IssuanceId,
    /// Prints used so far, including this one
    pub print_count: u32,
    /// Current limit
    pub max_prints: u32,
}

impl PrintOutcome {
    fn of(issuance: &Issuance) -> Self {
        Self {
            issuance_id: issuance.id,
            print_count: issuance.print_count,
            max_prints: issuance.max_prints,
        }
    }
}

/// Print counting and reprint decisions for issued letters
#[derive(Debug)]
pub struct PrintControl<E> {
    effects: Arc<E>,
}

impl<E> Clone for PrintControl<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
        }
    }
}

impl<E: IssuanceEffects> PrintControl<E> {
    /// Create print control over `effects`
    pub fn new(effects: Arc<E>) -> Self {
        Self { effects }
    }

    /// Record one print of the letter's issued document
    pub async fn print(&self, actor: &ActorId, letter_id: &LetterId) -> VerityResult<PrintOutcome> {
        let issuance = self.issued(letter_id).await?;
        if !issuance.can_print() {
            info!(
                letter_id = %letter_id,
                print_count = issuance.print_count,
                max_prints = issuance.max_prints,
                "print refused"
            );
            return Err(VerityError::permission_denied(PRINT_LIMIT_REACHED));
        }

        let now = self.effects.now().await;
        let guard = CommitGuard::for_letter(letter_id.clone())
            .status(LetterStatus::Issued)
            .print_state(&issuance);
        let printed = Issuance {
            print_count: issuance.print_count + 1,
            ..issuance
        };
        let audit = AuditEntry::new(AuditAction::Print, letter_id.clone(), actor.clone(), now)
            .with_metadata(json!({
                "issuance_id": printed.id,
                "print_count": printed.print_count,
                "max_prints": printed.max_prints,
            }));
        let outcome = PrintOutcome::of(&printed);

        self.effects
            .commit(
                guard,
                LetterMutation::new()
                    .with(Write::UpdateIssuance(printed))
                    .with(Write::Audit(audit)),
            )
            .await
            .map_err(|err| {
                warn!(letter_id = %letter_id, error = %err, "print commit failed");
                VerityError::from(err)
            })?;

        info!(
            letter_id = %letter_id,
            print_count = outcome.print_count,
            max_prints = outcome.max_prints,
            "letter printed"
        );
        Ok(outcome)
    }

    /// Open a PENDING reprint request
    pub async fn request_reprint(
        &self,
        actor: &ActorId,
        letter_id: &LetterId,
        reason: &str,
    ) -> VerityResult<PrintRequest> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(VerityError::invalid("Reason is required"));
        }
        let issuance = self.issued(letter_id).await?;

        let now = self.effects.now().await;
        let request = PrintRequest {
            id: self.effects.print_request_id().await,
            issuance_id: issuance.id,
            letter_id: letter_id.clone(),
            requested_by: actor.clone(),
            reason: reason.to_string(),
            status: PrintRequestStatus::Pending,
            created_at: now,
            decided_by: None,
            decided_at: None,
        };
        let audit = AuditEntry::new(
            AuditAction::ReprintRequest,
            letter_id.clone(),
            actor.clone(),
            now,
        )
        .with_metadata(json!({ "request_id": request.id, "reason": reason }));

        self.effects
            .commit(
                CommitGuard::for_letter(letter_id.clone()).status(LetterStatus::Issued),
                LetterMutation::new()
                    .with(Write::PutPrintRequest(request.clone()))
                    .with(Write::Audit(audit)),
            )
            .await?;

        info!(letter_id = %letter_id, request_id = %request.id, "reprint requested");
        Ok(request)
    }

    /// Approve a PENDING request and raise the print limit by one
    pub async fn approve_reprint(
        &self,
        actor: &ActorId,
        request_id: &PrintRequestId,
    ) -> VerityResult<PrintRequest> {
        let request = self.pending(request_id).await?;
        let issuance = self
            .effects
            .issuance_for_letter(&request.letter_id)
            .await?
            .filter(|issuance| issuance.id == request.issuance_id)
            .ok_or_else(|| {
                VerityError::not_found(format!("Issuance {} not found", request.issuance_id))
            })?;

        let now = self.effects.now().await;
        let guard = CommitGuard::for_letter(request.letter_id.clone())
            .request_status(request.id, PrintRequestStatus::Pending)
            .print_state(&issuance);
        let extended = Issuance {
            max_prints: issuance.max_prints.saturating_add(1),
            ..issuance
        };
        let decided = PrintRequest {
            status: PrintRequestStatus::Approved,
            decided_by: Some(actor.clone()),
            decided_at: Some(now),
            ..request
        };
        let audit = AuditEntry::new(
            AuditAction::ReprintApprove,
            decided.letter_id.clone(),
            actor.clone(),
            now,
        )
        .with_metadata(json!({
            "request_id": decided.id,
            "max_prints": extended.max_prints,
        }));

        self.effects
            .commit(
                guard,
                LetterMutation::new()
                    .with(Write::UpdateIssuance(extended))
                    .with(Write::PutPrintRequest(decided.clone()))
                    .with(Write::Audit(audit)),
            )
            .await?;

        info!(letter_id = %decided.letter_id, request_id = %decided.id, "reprint approved");
        Ok(decided)
    }

    /// Reject a PENDING request
    pub async fn reject_reprint(
        &self,
        actor: &ActorId,
        request_id: &PrintRequestId,
    ) -> VerityResult<PrintRequest> {
        let request = self.pending(request_id).await?;
        let now = self.effects.now().await;
        let guard = CommitGuard::for_letter(request.letter_id.clone())
            .request_status(request.id, PrintRequestStatus::Pending);
        let decided = PrintRequest {
            status: PrintRequestStatus::Rejected,
            decided_by: Some(actor.clone()),
            decided_at: Some(now),
            ..request
        };
        let audit = AuditEntry::new(
            AuditAction::ReprintReject,
            decided.letter_id.clone(),
            actor.clone(),
            now,
        )
        .with_metadata(json!({ "request_id": decided.id }));

        self.effects
            .commit(
                guard,
                LetterMutation::new()
                    .with(Write::PutPrintRequest(decided.clone()))
                    .with(Write::Audit(audit)),
            )
            .await?;

        info!(letter_id = %decided.letter_id, request_id = %decided.id, "reprint rejected");
        Ok(decided)
    }

    async fn issued(&self, letter_id: &LetterId) -> VerityResult<Issuance> {
        let letter = self
            .effects
            .letter(letter_id)
            .await?
            .ok_or_else(|| VerityError::not_found(format!("Letter {letter_id} not found")))?;
        if letter.status != LetterStatus::Issued {
            return Err(VerityError::invalid(format!(
                "Letter must be ISSUED (currently {})",
                letter.status
            )));
        }
        self.effects
            .issuance_for_letter(letter_id)
            .await?
            .ok_or_else(|| VerityError::not_found(format!("Letter {letter_id} has no issuance")))
    }

    async fn pending(&self, request_id: &PrintRequestId) -> VerityResult<PrintRequest> {
        let request = self
            .effects
            .print_request(request_id)
            .await?
            .ok_or_else(|| VerityError::not_found(format!("Request {request_id} not found")))?;
        if request.status != PrintRequestStatus::Pending {
            return Err(VerityError::invalid("Request already processed"));
        }
        Ok(request)
    }
}
