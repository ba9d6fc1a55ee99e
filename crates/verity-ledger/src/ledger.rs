//! Version ledger
//!
//! `record_*` reads the head, derives the next number and commits the new
//! version under a guard pinning that head. A lost race surfaces from the
//! store as a conflict; the ledger re-reads and tries again, up to the
//! configured number of attempts.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use verity_core::effects::{
    CommitGuard, LetterMutation, LetterStore, PhysicalTimeEffects, StoreError, Write,
};
use verity_core::{
    content_digest, ActorId, ContentDigest, LetterId, LetterVersion, Timestamp,
    VerificationToken, VerityConfig, VerityError, VerityResult, VersionNumber,
};

/// Effects the ledger needs
pub trait LedgerEffects: LetterStore + PhysicalTimeEffects + Send + Sync {}

impl<T> LedgerEffects for T where T: LetterStore + PhysicalTimeEffects + Send + Sync {}

/// Outcome of recording a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedVersion {
    /// Number assigned to the new version
    pub version: VersionNumber,
    /// Digest of the recorded content
    pub digest: ContentDigest,
    /// Letter number drawn by the same commit, if the batch asked for one
    pub letter_number: Option<u64>,
}

/// First inconsistency found while auditing a history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrokenLink {
    /// Version numbers are not contiguous from 1
    Gap {
        /// Number that should have come next
        expected: VersionNumber,
        /// Number actually stored
        found: VersionNumber,
    },
    /// Stored digest does not match the stored content
    DigestMismatch {
        /// Offending version
        version: VersionNumber,
    },
}

/// Result of re-checking a letter's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerAudit {
    /// Audited letter
    pub letter_id: LetterId,
    /// Number of stored versions
    pub versions: usize,
    /// First inconsistency, if any
    pub broken: Option<BrokenLink>,
}

impl LedgerAudit {
    /// Whether the history is contiguous and every digest matches
    pub fn is_intact(&self) -> bool {
        self.broken.is_none()
    }
}

/// Build the immutable record for version `number`
pub fn version_record(
    letter_id: &LetterId,
    number: VersionNumber,
    content: &str,
    created_by: &ActorId,
    created_at: Timestamp,
    verification_token: Option<VerificationToken>,
) -> LetterVersion {
    LetterVersion {
        letter_id: letter_id.clone(),
        version_number: number,
        content: content.to_string(),
        content_digest: content_digest(content),
        created_by: created_by.clone(),
        created_at,
        verification_token,
    }
}

fn fetch_failed(err: impl std::fmt::Display) -> VerityError {
    VerityError::storage(format!("Failed to fetch versions: {err}"))
}

fn insert_failed(err: impl std::fmt::Display) -> VerityError {
    VerityError::storage(format!("Failed to insert version: {err}"))
}

/// Append-only version history over the letter store
#[derive(Debug)]
pub struct VersionLedger<E> {
    effects: Arc<E>,
    max_attempts: u32,
}

impl<E> Clone for VersionLedger<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            max_attempts: self.max_attempts,
        }
    }
}

impl<E: LedgerEffects> VersionLedger<E> {
    /// Create a ledger making at most `max_attempts` commits per record
    pub fn new(effects: Arc<E>, max_attempts: u32) -> Self {
        Self {
            effects,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create a ledger using `max_commit_attempts` from the configuration
    pub fn from_config(effects: Arc<E>, config: &VerityConfig) -> Self {
        Self::new(effects, config.max_commit_attempts)
    }

    /// Record `content` as the next version of `letter_id`
    pub async fn record_version(
        &self,
        letter_id: &LetterId,
        content: &str,
        actor: &ActorId,
    ) -> VerityResult<RecordedVersion> {
        self.record_with(
            CommitGuard::for_letter(letter_id.clone()),
            content,
            actor,
            |_| LetterMutation::new(),
        )
        .await
    }

    /// Record the next version together with the writes produced by `extend`
    ///
    /// `guard` carries any extra preconditions (for example the letter still
    /// being a draft); the ledger adds the head pin on every attempt. `extend`
    /// is called once per attempt with the version about to be written.
    pub async fn record_with<F>(
        &self,
        guard: CommitGuard,
        content: &str,
        actor: &ActorId,
        mut extend: F,
    ) -> VerityResult<RecordedVersion>
    where
        F: FnMut(&LetterVersion) -> LetterMutation + Send,
    {
        let letter_id = guard.letter_id.clone();

        for attempt in 1..=self.max_attempts {
            let head = self
                .effects
                .latest_version(&letter_id)
                .await
                .map_err(fetch_failed)?;

            match self.commit_at(&guard, head, content, actor, &mut extend).await? {
                Ok(recorded) => return Ok(recorded),
                Err(err) if err.is_conflict() => {
                    warn!(letter_id = %letter_id, attempt, error = %err, "version commit lost a race, retrying");
                }
                Err(err) => return Err(insert_failed(err)),
            }
        }

        Err(VerityError::conflict(format!(
            "letter {letter_id} changed concurrently; gave up after {} attempts",
            self.max_attempts
        )))
    }

    /// Record the version following `head`, which the caller has already observed
    ///
    /// Makes a single attempt. When the head has moved, or another guard
    /// precondition fails, the writes are dropped and a conflict is returned
    /// instead of re-applying them on top of state the caller never saw.
    pub async fn record_at<F>(
        &self,
        guard: CommitGuard,
        head: VersionNumber,
        content: &str,
        actor: &ActorId,
        mut extend: F,
    ) -> VerityResult<RecordedVersion>
    where
        F: FnMut(&LetterVersion) -> LetterMutation + Send,
    {
        let letter_id = guard.letter_id.clone();
        match self.commit_at(&guard, head, content, actor, &mut extend).await? {
            Ok(recorded) => Ok(recorded),
            Err(err) if err.is_conflict() => {
                debug!(letter_id = %letter_id, head = %head, error = %err, "pinned version commit rejected");
                Err(VerityError::conflict(format!(
                    "Letter {letter_id} changed after version {head}: {err}"
                )))
            }
            Err(err) => Err(insert_failed(err)),
        }
    }

    async fn commit_at<F>(
        &self,
        guard: &CommitGuard,
        head: VersionNumber,
        content: &str,
        actor: &ActorId,
        extend: &mut F,
    ) -> VerityResult<Result<RecordedVersion, StoreError>>
    where
        F: FnMut(&LetterVersion) -> LetterMutation + Send,
    {
        let letter_id = &guard.letter_id;
        let next = head.next().ok_or_else(|| {
            VerityError::internal(format!("version numbers exhausted for letter {letter_id}"))
        })?;
        let now = self.effects.now().await;
        let record = version_record(letter_id, next, content, actor, now, None);
        let digest = record.content_digest;

        let mut mutation = extend(&record);
        mutation.push(Write::AppendVersion(record));

        Ok(self
            .effects
            .commit(guard.clone().head(head), mutation)
            .await
            .map(|receipt| {
                debug!(letter_id = %letter_id, version = %next, digest = %digest, "recorded version");
                RecordedVersion {
                    version: next,
                    digest,
                    letter_number: receipt.letter_number,
                }
            }))
    }

    /// All versions of a letter, oldest first
    pub async fn history(&self, letter_id: &LetterId) -> VerityResult<Vec<LetterVersion>> {
        self.effects.versions(letter_id).await.map_err(fetch_failed)
    }

    /// Re-check contiguity and recompute every digest
    pub async fn audit_history(&self, letter_id: &LetterId) -> VerityResult<LedgerAudit> {
        let versions = self.history(letter_id).await?;

        let broken = (1u32..).zip(&versions).find_map(|(expected, version)| {
            if version.version_number.value() != expected {
                Some(BrokenLink::Gap {
                    expected: VersionNumber(expected),
                    found: version.version_number,
                })
            } else if content_digest(&version.content) != version.content_digest {
                Some(BrokenLink::DigestMismatch {
                    version: version.version_number,
                })
            } else {
                None
            }
        });

        if let Some(link) = &broken {
            warn!(letter_id = %letter_id, ?link, "version history failed audit");
        }

        Ok(LedgerAudit {
            letter_id: letter_id.clone(),
            versions: versions.len(),
            broken,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_testkit::{at, ControllableClock};

    #[test]
    fn test_version_record_digests_content() {
        let record = version_record(
            &LetterId::new("l-1"),
            VersionNumber(1),
            "some content",
            &ActorId::new("alice"),
            at(0),
            None,
        );
        assert_eq!(
            record.content_digest.to_hex(),
            "290f493c44f5d63d06b374d0a5abd292fae38b92cab2fae5efefe1b0e9347f56"
        );
        assert!(record.verification_token.is_none());
    }

    #[test]
    fn test_attempts_are_at_least_one() {
        let effects = Arc::new(verity_effects::VerityEffectSystem::new(
            verity_effects::MemoryLetterStore::new(),
            ControllableClock::default(),
            verity_effects::OsRandom::new(),
            verity_effects::TextRenderer::new(),
        ));
        let ledger = VersionLedger::new(effects, 0);
        assert_eq!(ledger.max_attempts, 1);
    }
}
