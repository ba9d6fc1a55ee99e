//! Letter service
//!
//! The operations behind the letter HTTP surface. Each one authorizes the
//! actor, validates input against the current state and then commits every
//! write it makes (letter row, versions, approvals, audit entry) in a single
//! guarded batch. A failed check never leaves a write behind.

use crate::commands::{IssueOutcome, LetterEdit, NewAcknowledgement, NewLetter};
use crate::guards::{authorize, authorize_committee, authorize_on, Operation};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use verity_core::effects::{
    CommitGuard, LetterMutation, RenderError, RenderRequest, RenderedDocument, VerityEffects,
    Write,
};
use verity_core::{
    normalize_tag_ids, Acknowledgement, Actor, AuditAction, AuditEntry, Channel, Committee,
    CommitteeApproval, CommitteeId, ConfigLayers, Department, DepartmentId, DirectApproval,
    Issuance, IssuingContext, Letter, LetterId, LetterQuery, LetterStatus, LetterVersion,
    PrintJob, PrintRequest, PrintRequestId, RenderStatus, Tag, VerityConfig, VerityError,
    VerityResult,
};
use verity_issuance::{IssuanceCoordinator, IssueCommand, PrintControl, PrintOutcome};
use verity_ledger::{LedgerAudit, VersionLedger};
use verity_verification::{AccessGate, VerificationResult, Verifier};

/// Letter lifecycle over a set of effects
#[derive(Debug)]
pub struct LetterService<E> {
    effects: Arc<E>,
    config: VerityConfig,
    ledger: VersionLedger<E>,
    coordinator: IssuanceCoordinator<E>,
    printing: PrintControl<E>,
    verifier: Verifier<E>,
}

impl<E> Clone for LetterService<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            config: self.config.clone(),
            ledger: self.ledger.clone(),
            coordinator: self.coordinator.clone(),
            printing: self.printing.clone(),
            verifier: self.verifier.clone(),
        }
    }
}

impl<E: VerityEffects> LetterService<E> {
    /// Create the service, rejecting an invalid configuration
    pub fn new(effects: Arc<E>, config: VerityConfig) -> VerityResult<Self> {
        config.validate()?;
        Ok(Self {
            ledger: VersionLedger::from_config(Arc::clone(&effects), &config),
            coordinator: IssuanceCoordinator::new(Arc::clone(&effects)),
            printing: PrintControl::new(Arc::clone(&effects)),
            verifier: Verifier::new(Arc::clone(&effects), AccessGate::from_config(&config)),
            effects,
            config,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &VerityConfig {
        &self.config
    }

    /// Draft a letter; version 1 is written with it
    pub async fn create_letter(&self, actor: &Actor, input: NewLetter) -> VerityResult<Letter> {
        authorize(actor, Operation::Create)?;
        require_content(&input.content)?;
        self.check_department(&input.department_id, input.context).await?;
        if let Some(committee_id) = &input.committee_id {
            self.committee(committee_id).await?;
        }

        let id = LetterId::new(self.effects.random_uuid().await.to_string());
        let now = self.effects.now().await;
        let letter = Letter {
            id: id.clone(),
            context: input.context,
            department_id: input.department_id,
            content: input.content,
            tag_ids: normalize_tag_ids(&input.tag_ids),
            status: LetterStatus::Draft,
            committee_id: input.committee_id,
            created_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
            letter_number: None,
            rejection_reason: None,
            rejected_at: None,
            revoked_at: None,
        };

        self.ledger
            .record_with(
                CommitGuard::for_letter(id.clone()).absent(),
                &letter.content,
                &actor.id,
                |version| {
                    LetterMutation::new()
                        .with(Write::InsertLetter(letter.clone()))
                        .with(Write::Audit(audit(
                            AuditAction::Create,
                            &letter,
                            actor,
                            json!({
                                "context": letter.context,
                                "department_id": letter.department_id,
                                "version": version.version_number,
                            }),
                        )))
                },
            )
            .await?;

        info!(letter_id = %id, actor = %actor.id, context = %letter.context, "letter created");
        Ok(letter)
    }

    /// Change a draft and record its new content as the next version
    ///
    /// The edit applies to the letter as loaded. If another edit commits
    /// first, this one fails with a conflict rather than overwriting it.
    pub async fn edit_letter(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        edit: LetterEdit,
    ) -> VerityResult<Letter> {
        let head = self.effects.latest_version(letter_id).await?;
        let letter = self.load(letter_id).await?;
        authorize_on(actor, Operation::Edit, &letter)?;
        require_status(&letter, &[LetterStatus::Draft], "edit")?;
        require_content(&edit.content)?;

        let department_id = edit.department_id.unwrap_or_else(|| letter.department_id.clone());
        if department_id != letter.department_id {
            self.check_department(&department_id, letter.context).await?;
        }
        if let Some(committee_id) = &edit.committee_id {
            self.committee(committee_id).await?;
        }

        let now = self.effects.now().await;
        let updated = Letter {
            department_id,
            content: edit.content,
            tag_ids: edit
                .tag_ids
                .as_ref()
                .map(normalize_tag_ids)
                .unwrap_or_else(|| letter.tag_ids.clone()),
            committee_id: edit.committee_id.or_else(|| letter.committee_id.clone()),
            updated_at: now,
            ..letter
        };

        let recorded = self
            .ledger
            .record_at(
                CommitGuard::for_letter(letter_id.clone()).status(LetterStatus::Draft),
                head,
                &updated.content,
                &actor.id,
                |version| {
                    LetterMutation::new()
                        .with(Write::UpdateLetter(updated.clone()))
                        .with(Write::Audit(audit(
                            AuditAction::Update,
                            &updated,
                            actor,
                            json!({ "version": version.version_number }),
                        )))
                },
            )
            .await?;

        info!(letter_id = %letter_id, version = %recorded.version, "letter edited");
        Ok(updated)
    }

    /// Approve a draft directly
    pub async fn approve(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        comment: Option<String>,
    ) -> VerityResult<Letter> {
        authorize(actor, Operation::Approve)?;
        let letter = self.load(letter_id).await?;
        if let Some(committee_id) = &letter.committee_id {
            debug!(letter_id = %letter_id, committee_id = %committee_id, "direct approval refused");
            return Err(VerityError::committee_approval_required(committee_id.as_str()));
        }
        require_status(&letter, &[LetterStatus::Draft], "approve")?;

        let now = self.effects.now().await;
        let approval = DirectApproval {
            letter_id: letter_id.clone(),
            approver_id: actor.id.clone(),
            comment,
            approved_at: Some(now),
        };
        let approved = Letter {
            status: LetterStatus::Approved,
            updated_at: now,
            ..letter
        };
        let entry = audit(
            AuditAction::Approve,
            &approved,
            actor,
            json!({ "comment": approval.comment }),
        );

        self.transition(
            &[LetterStatus::Draft],
            LetterMutation::new()
                .with(Write::AppendApproval(approval))
                .with(Write::UpdateLetter(approved.clone()))
                .with(Write::Audit(entry)),
            letter_id,
        )
        .await?;

        info!(letter_id = %letter_id, approver = %actor.id, "letter approved");
        Ok(approved)
    }

    /// Approve a committee-routed draft as a committee member
    pub async fn committee_approve(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        comment: Option<String>,
    ) -> VerityResult<Letter> {
        let letter = self.load(letter_id).await?;
        let committee_id = letter.committee_id.clone().ok_or_else(|| {
            VerityError::invalid(format!("Letter {letter_id} is not assigned to a committee"))
        })?;
        let committee = self.committee(&committee_id).await?;
        authorize_committee(actor, &committee)?;
        require_status(&letter, &[LetterStatus::Draft], "approve")?;

        let now = self.effects.now().await;
        let approval = CommitteeApproval {
            letter_id: letter_id.clone(),
            committee_id: committee_id.clone(),
            approver_id: actor.id.clone(),
            comment,
            approved_at: Some(now),
        };
        let approved = Letter {
            status: LetterStatus::Approved,
            updated_at: now,
            ..letter
        };
        let entry = audit(
            AuditAction::CommitteeApprove,
            &approved,
            actor,
            json!({ "committee_id": committee_id, "comment": approval.comment }),
        );

        self.transition(
            &[LetterStatus::Draft],
            LetterMutation::new()
                .with(Write::AppendCommitteeApproval(approval))
                .with(Write::UpdateLetter(approved.clone()))
                .with(Write::Audit(entry)),
            letter_id,
        )
        .await?;

        info!(letter_id = %letter_id, committee_id = %committee_id, approver = %actor.id, "letter approved by committee");
        Ok(approved)
    }

    /// Reject a draft or approved letter
    pub async fn reject(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        reason: &str,
    ) -> VerityResult<Letter> {
        authorize(actor, Operation::Reject)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(VerityError::invalid("Reason is required"));
        }
        let letter = self.load(letter_id).await?;
        let allowed = [LetterStatus::Draft, LetterStatus::Approved];
        require_status(&letter, &allowed, "reject")?;

        let now = self.effects.now().await;
        let rejected = Letter {
            status: LetterStatus::Rejected,
            rejection_reason: Some(reason.to_string()),
            rejected_at: Some(now),
            updated_at: now,
            ..letter
        };
        let entry = audit(
            AuditAction::Reject,
            &rejected,
            actor,
            json!({ "reason": reason }),
        );

        self.transition(
            &allowed,
            LetterMutation::new()
                .with(Write::UpdateLetter(rejected.clone()))
                .with(Write::Audit(entry)),
            letter_id,
        )
        .await?;

        info!(letter_id = %letter_id, actor = %actor.id, "letter rejected");
        Ok(rejected)
    }

    /// Revoke an approved or issued letter
    pub async fn revoke(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        reason: Option<String>,
    ) -> VerityResult<Letter> {
        authorize(actor, Operation::Revoke)?;
        let letter = self.load(letter_id).await?;
        let allowed = [LetterStatus::Approved, LetterStatus::Issued];
        require_status(&letter, &allowed, "revoke")?;

        let now = self.effects.now().await;
        let revoked = Letter {
            status: LetterStatus::Revoked,
            revoked_at: Some(now),
            updated_at: now,
            ..letter
        };
        let entry = audit(
            AuditAction::Revoke,
            &revoked,
            actor,
            json!({ "reason": reason }),
        );

        self.transition(
            &allowed,
            LetterMutation::new()
                .with(Write::UpdateLetter(revoked.clone()))
                .with(Write::Audit(entry)),
            letter_id,
        )
        .await?;

        warn!(letter_id = %letter_id, actor = %actor.id, "letter revoked");
        Ok(revoked)
    }

    /// Issue an approved letter and render its document
    ///
    /// Issuing an already issued letter returns the stored issuance. A render
    /// failure leaves the issuance in place with status FAILED.
    pub async fn issue(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        channel: Channel,
    ) -> VerityResult<IssueOutcome> {
        self.issue_with(actor, letter_id, channel, None).await
    }

    /// Issue on the PRINT channel, sending the job to `printer_id`
    pub async fn issue_to_printer(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        printer_id: &str,
    ) -> VerityResult<IssueOutcome> {
        self.issue_with(actor, letter_id, Channel::Print, Some(printer_id))
            .await
    }

    async fn issue_with(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        channel: Channel,
        printer_id: Option<&str>,
    ) -> VerityResult<IssueOutcome> {
        authorize(actor, Operation::Issue)?;
        let letter = self.load(letter_id).await?;
        let head = self.effects.latest_version(letter_id).await?;
        let token = self.effects.verification_token().await;
        let mut command = IssueCommand::prepare(
            &letter,
            head,
            actor.id.clone(),
            channel,
            token,
            self.config.default_max_prints,
        )?;
        if let Some(printer_id) = printer_id {
            command = command.on_printer(printer_id);
        }

        let receipt = self.coordinator.issue(command).await?;
        let verification_url = self
            .config
            .verification_url(&receipt.verification_token.to_string());

        let issuance = self
            .effects
            .issuance_for_letter(letter_id)
            .await?
            .ok_or_else(|| VerityError::internal(format!("issuance of {letter_id} vanished")))?;
        if receipt.replayed && issuance.render_status == RenderStatus::Ready {
            return Ok(IssueOutcome {
                receipt,
                verification_url,
                render_status: RenderStatus::Ready,
                document: None,
                render_recorded: true,
            });
        }

        let issued = self.load(letter_id).await?;
        let (render_status, document) = match self
            .render_issued(issued, issuance, verification_url.clone())
            .await?
        {
            Ok(document) => (RenderStatus::Ready, Some(document)),
            Err(err) => {
                warn!(letter_id = %letter_id, error = %err, "document render failed; issuance kept");
                (RenderStatus::Failed, None)
            }
        };
        let render_recorded = match self.mark_render(letter_id, render_status).await {
            Ok(()) => true,
            Err(err) => {
                warn!(letter_id = %letter_id, error = %err, "could not record render status");
                false
            }
        };

        Ok(IssueOutcome {
            receipt,
            verification_url,
            render_status,
            document,
            render_recorded,
        })
    }

    /// Render the document of an issued letter again
    ///
    /// Records the render status either way. A renderer failure surfaces as
    /// a rendering error.
    pub async fn render_document(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
    ) -> VerityResult<RenderedDocument> {
        let letter = self.load(letter_id).await?;
        authorize_on(actor, Operation::Render, &letter)?;
        require_status(&letter, &[LetterStatus::Issued], "render")?;
        let issuance = self.issuance(letter_id).await?;
        let verification_url = self
            .config
            .verification_url(&issuance.verification_token.to_string());

        let rendered = self.render_issued(letter, issuance, verification_url).await?;
        let status = match &rendered {
            Ok(_) => RenderStatus::Ready,
            Err(_) => RenderStatus::Failed,
        };
        self.mark_render(letter_id, status).await?;
        info!(letter_id = %letter_id, actor = %actor.id, render_status = ?status, "document re-rendered");
        rendered.map_err(VerityError::from)
    }

    /// Verify a presented fingerprint or token
    pub async fn verify(
        &self,
        access_key: Option<&str>,
        key: &str,
    ) -> VerityResult<VerificationResult> {
        self.verifier.verify(access_key, key).await
    }

    /// Record one print of an issued letter
    pub async fn print(&self, actor: &Actor, letter_id: &LetterId) -> VerityResult<PrintOutcome> {
        let letter = self.load(letter_id).await?;
        authorize_on(actor, Operation::Print, &letter)?;
        self.printing.print(&actor.id, letter_id).await
    }

    /// Ask for one more print of an issued letter
    pub async fn request_reprint(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        reason: &str,
    ) -> VerityResult<PrintRequest> {
        let letter = self.load(letter_id).await?;
        authorize_on(actor, Operation::RequestReprint, &letter)?;
        self.printing
            .request_reprint(&actor.id, letter_id, reason)
            .await
    }

    /// Approve a pending reprint request
    pub async fn approve_reprint(
        &self,
        actor: &Actor,
        request_id: &PrintRequestId,
    ) -> VerityResult<PrintRequest> {
        authorize(actor, Operation::DecideReprint)?;
        self.printing.approve_reprint(&actor.id, request_id).await
    }

    /// Reject a pending reprint request
    pub async fn reject_reprint(
        &self,
        actor: &Actor,
        request_id: &PrintRequestId,
    ) -> VerityResult<PrintRequest> {
        authorize(actor, Operation::DecideReprint)?;
        self.printing.reject_reprint(&actor.id, request_id).await
    }

    /// Print jobs sent for a letter's issuance, oldest first
    pub async fn print_jobs(&self, letter_id: &LetterId) -> VerityResult<Vec<PrintJob>> {
        self.load(letter_id).await?;
        match self.effects.issuance_for_letter(letter_id).await? {
            Some(issuance) => Ok(self.effects.print_jobs(&issuance.id).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Record that an issued letter reached its recipient
    pub async fn acknowledge(
        &self,
        actor: &Actor,
        letter_id: &LetterId,
        input: NewAcknowledgement,
    ) -> VerityResult<Acknowledgement> {
        let letter = self.load(letter_id).await?;
        authorize_on(actor, Operation::Acknowledge, &letter)?;
        let job_reference = input.job_reference.trim();
        if job_reference.is_empty() {
            return Err(VerityError::invalid("Job reference is required"));
        }
        require_status(&letter, &[LetterStatus::Issued], "acknowledge")?;

        let now = self.effects.now().await;
        let acknowledgement = Acknowledgement {
            id: self.effects.acknowledgement_id().await,
            letter_id: letter_id.clone(),
            job_reference: job_reference.to_string(),
            file_url: input.file_url.filter(|url| !url.trim().is_empty()),
            captured_by: actor.id.clone(),
            captured_at: now,
        };
        let entry = AuditEntry::new(
            AuditAction::Acknowledge,
            letter_id.clone(),
            actor.id.clone(),
            now,
        )
        .with_metadata(json!({
            "acknowledgement_id": acknowledgement.id,
            "job_reference": acknowledgement.job_reference,
            "file_url": acknowledgement.file_url,
            "captured_by": actor.id,
        }));

        self.transition(
            &[LetterStatus::Issued],
            LetterMutation::new()
                .with(Write::InsertAcknowledgement(acknowledgement.clone()))
                .with(Write::Audit(entry)),
            letter_id,
        )
        .await?;

        info!(
            letter_id = %letter_id,
            job_reference = %acknowledgement.job_reference,
            "delivery acknowledged"
        );
        Ok(acknowledgement)
    }

    /// Delivery acknowledgements of a letter, oldest first
    pub async fn acknowledgements(
        &self,
        letter_id: &LetterId,
    ) -> VerityResult<Vec<Acknowledgement>> {
        self.load(letter_id).await?;
        Ok(self.effects.acknowledgements(letter_id).await?)
    }

    /// Fetch a letter
    pub async fn letter(&self, letter_id: &LetterId) -> VerityResult<Letter> {
        self.load(letter_id).await
    }

    /// One page of letters, newest first
    pub async fn list_letters(&self, query: LetterQuery) -> VerityResult<Vec<Letter>> {
        Ok(self.effects.letters(&query).await?)
    }

    /// Departments a letter can be drafted for
    pub async fn departments(
        &self,
        context: Option<IssuingContext>,
    ) -> VerityResult<Vec<Department>> {
        Ok(self.effects.departments(context).await?)
    }

    /// Tags offered when drafting
    pub async fn tags(&self, context: Option<IssuingContext>) -> VerityResult<Vec<Tag>> {
        Ok(self.effects.tags(context).await?)
    }

    /// Committees a letter can be routed to
    pub async fn committees(
        &self,
        context: Option<IssuingContext>,
    ) -> VerityResult<Vec<Committee>> {
        Ok(self.effects.committees(context).await?)
    }

    /// Version history of a letter, oldest first
    pub async fn versions(&self, letter_id: &LetterId) -> VerityResult<Vec<LetterVersion>> {
        self.load(letter_id).await?;
        self.ledger.history(letter_id).await
    }

    /// Audit trail of a letter in commit order
    pub async fn audit_log(&self, letter_id: &LetterId) -> VerityResult<Vec<AuditEntry>> {
        self.load(letter_id).await?;
        Ok(self.effects.audit_log(letter_id).await?)
    }

    /// Re-check the stored version history of a letter
    pub async fn audit_history(&self, letter_id: &LetterId) -> VerityResult<LedgerAudit> {
        self.load(letter_id).await?;
        self.ledger.audit_history(letter_id).await
    }

    async fn load(&self, letter_id: &LetterId) -> VerityResult<Letter> {
        self.effects
            .letter(letter_id)
            .await?
            .ok_or_else(|| VerityError::not_found(format!("Letter {letter_id} not found")))
    }

    async fn issuance(&self, letter_id: &LetterId) -> VerityResult<Issuance> {
        self.effects
            .issuance_for_letter(letter_id)
            .await?
            .ok_or_else(|| VerityError::not_found(format!("Letter {letter_id} has no issuance")))
    }

    async fn render_issued(
        &self,
        letter: Letter,
        issuance: Issuance,
        verification_url: String,
    ) -> VerityResult<Result<RenderedDocument, RenderError>> {
        let department = self.effects.department(&letter.department_id).await?;
        let request = RenderRequest {
            letter,
            issuance,
            department,
            verification_url,
        };
        Ok(self.effects.render(&request).await)
    }

    async fn check_department(
        &self,
        department_id: &DepartmentId,
        context: IssuingContext,
    ) -> VerityResult<()> {
        let department = self.effects.department(department_id).await?.ok_or_else(|| {
            VerityError::invalid(format!("Department {department_id} not found"))
        })?;
        if department.context != context {
            return Err(VerityError::invalid(format!(
                "Department {department_id} does not belong to {context}"
            )));
        }
        Ok(())
    }

    async fn committee(&self, committee_id: &CommitteeId) -> VerityResult<Committee> {
        self.effects
            .committee(committee_id)
            .await?
            .ok_or_else(|| VerityError::invalid(format!("Committee {committee_id} not found")))
    }

    async fn transition(
        &self,
        allowed: &[LetterStatus],
        mutation: LetterMutation,
        letter_id: &LetterId,
    ) -> VerityResult<()> {
        let guard = CommitGuard::for_letter(letter_id.clone()).status_in(allowed.iter().copied());
        self.effects.commit(guard, mutation).await?;
        Ok(())
    }

    async fn mark_render(&self, letter_id: &LetterId, status: RenderStatus) -> VerityResult<()> {
        for _ in 0..self.config.max_commit_attempts.max(1) {
            let issuance = self.issuance(letter_id).await?;
            if issuance.render_status == status {
                return Ok(());
            }
            let guard = CommitGuard::for_letter(letter_id.clone()).print_state(&issuance);
            let updated = Issuance {
                render_status: status,
                ..issuance
            };
            match self
                .effects
                .commit(guard, LetterMutation::new().with(Write::UpdateIssuance(updated)))
                .await
            {
                Ok(_) => return Ok(()),
                Err(err) if err.is_conflict() => {
                    debug!(letter_id = %letter_id, "render status update raced a print, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(VerityError::conflict(format!(
            "render status of {letter_id} kept changing"
        )))
    }
}

fn require_content(content: &str) -> VerityResult<()> {
    if content.trim().is_empty() {
        return Err(VerityError::invalid("Content is required"));
    }
    Ok(())
}

fn require_status(letter: &Letter, allowed: &[LetterStatus], action: &str) -> VerityResult<()> {
    if allowed.contains(&letter.status) {
        return Ok(());
    }
    let expected = allowed
        .iter()
        .map(LetterStatus::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(VerityError::invalid(format!(
        "Letter must be {expected} to {action} (currently {})",
        letter.status
    )))
}

fn audit(
    action: AuditAction,
    letter: &Letter,
    actor: &Actor,
    metadata: serde_json::Value,
) -> AuditEntry {
    AuditEntry::new(action, letter.id.clone(), actor.id.clone(), letter.updated_at)
        .with_metadata(metadata)
}
