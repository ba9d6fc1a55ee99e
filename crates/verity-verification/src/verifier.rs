//! Verification lookups
//!
//! Resolves a presented key to its issuance, re-derives the fingerprint from
//! the stored letter and frozen version, and builds the verdict. Any key that
//! does not resolve cleanly gets the same generic answer.

use crate::gate::AccessGate;
use crate::key::VerificationKey;
use crate::verdict::{build_verdict, VerificationResult, VerificationSnapshot};
use std::sync::Arc;
use tracing::{debug, info, warn};
use verity_core::effects::LetterStore;
use verity_core::fingerprint::{fingerprint, FingerprintInput};
use verity_core::{Issuance, VerityResult};

/// Answers verification lookups against the letter store
#[derive(Debug)]
pub struct Verifier<E> {
    effects: Arc<E>,
    gate: AccessGate,
}

impl<E> Clone for Verifier<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            gate: self.gate.clone(),
        }
    }
}

impl<E: LetterStore> Verifier<E> {
    /// Create a verifier behind `gate`
    pub fn new(effects: Arc<E>, gate: AccessGate) -> Self {
        Self { effects, gate }
    }

    /// Verify `raw_key`, presenting `access_key` to the gate
    ///
    /// Fails only when the gate rejects the caller or the store is
    /// unavailable; unknown and malformed keys yield the generic verdict.
    pub async fn verify(
        &self,
        access_key: Option<&str>,
        raw_key: &str,
    ) -> VerityResult<VerificationResult> {
        self.gate.check(access_key)?;

        let Some(key) = VerificationKey::parse(raw_key) else {
            debug!("verification key has no recognized format");
            return Ok(VerificationResult::unknown());
        };

        let issuance = match key {
            VerificationKey::Fingerprint(fp) => self.effects.issuance_by_fingerprint(&fp).await?,
            VerificationKey::Token(token) => self.effects.issuance_by_token(&token).await?,
        };
        let Some(issuance) = issuance else {
            debug!(kind = key.kind(), "no issuance for verification key");
            return Ok(VerificationResult::unknown());
        };

        let Some(snapshot) = self.snapshot(issuance).await? else {
            return Ok(VerificationResult::unknown());
        };

        let verdict = build_verdict(&snapshot);
        info!(
            kind = key.kind(),
            letter_id = %snapshot.letter.id,
            status = ?verdict.status,
            "verification lookup"
        );
        Ok(verdict)
    }

    /// Gather the snapshot for an issuance, `None` when the records do not line up
    async fn snapshot(&self, issuance: Issuance) -> VerityResult<Option<VerificationSnapshot>> {
        let letter_id = &issuance.letter_id;
        let Some(letter) = self.effects.letter(letter_id).await? else {
            warn!(letter_id = %letter_id, "issuance refers to a missing letter");
            return Ok(None);
        };
        let Some(version) = self
            .effects
            .version(letter_id, issuance.version_number)
            .await?
        else {
            warn!(letter_id = %letter_id, version = %issuance.version_number, "issued version is missing");
            return Ok(None);
        };

        let recomputed = fingerprint(
            &FingerprintInput::for_letter(&letter, version.version_number)
                .with_content(&version.content),
        )?;
        if recomputed != issuance.fingerprint {
            warn!(
                letter_id = %letter_id,
                stored = %issuance.fingerprint,
                recomputed = %recomputed,
                "issued letter no longer matches its fingerprint"
            );
            return Ok(None);
        }

        let approvals = self.effects.approvals(letter_id).await?;
        let department_name = self
            .effects
            .department(&letter.department_id)
            .await?
            .map(|department| department.name);

        Ok(Some(VerificationSnapshot {
            version_number: version.version_number,
            letter,
            department_name,
            approvals,
            issuances: vec![issuance],
        }))
    }
}
