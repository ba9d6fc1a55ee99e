//! Letters and their immutable version snapshots

use super::identifiers::{
    ActorId, CommitteeId, DepartmentId, LetterId, VerificationToken, VersionNumber,
};
use super::Timestamp;
use crate::hash::ContentDigest;
use crate::tags::TagSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Issuing authority a letter is written under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuingContext {
    /// Company letterhead
    Company,
    /// Board letterhead
    Bcba,
}

impl IssuingContext {
    /// Wire form used in fingerprints and responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "COMPANY",
            Self::Bcba => "BCBA",
        }
    }
}

impl fmt::Display for IssuingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssuingContext {
    type Err = crate::VerityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPANY" => Ok(Self::Company),
            "BCBA" => Ok(Self::Bcba),
            other => Err(crate::VerityError::invalid(format!(
                "Unknown issuing context: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LetterStatus {
    /// Editable working copy
    Draft,
    /// Approved by an approver or committee, not yet issued
    Approved,
    /// Frozen and handed out
    Issued,
    /// Declined with a reason; terminal
    Rejected,
    /// Withdrawn after approval or issuance; terminal
    Revoked,
}

impl LetterStatus {
    /// Wire form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
            Self::Issued => "ISSUED",
            Self::Rejected => "REJECTED",
            Self::Revoked => "REVOKED",
        }
    }

    /// Content, department, tags and committee may only change in this state
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// No transition leaves this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Revoked)
    }
}

impl fmt::Display for LetterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of a letter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
    /// Letter identifier
    pub id: LetterId,
    /// Issuing authority
    pub context: IssuingContext,
    /// Owning department
    pub department_id: DepartmentId,
    /// Letter body
    pub content: String,
    /// Normalized tag ids
    pub tag_ids: TagSet,
    /// Lifecycle status
    pub status: LetterStatus,
    /// Committee the letter must be approved by, if any
    pub committee_id: Option<CommitteeId>,
    /// Author of the first draft
    pub created_by: ActorId,
    /// Creation time
    pub created_at: Timestamp,
    /// Last mutation time
    pub updated_at: Timestamp,
    /// Sequential reference number assigned at issuance
    pub letter_number: Option<u64>,
    /// Reason recorded on rejection
    pub rejection_reason: Option<String>,
    /// Rejection time
    pub rejected_at: Option<Timestamp>,
    /// Revocation time
    pub revoked_at: Option<Timestamp>,
}

/// Immutable snapshot of a letter body at one point in its history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterVersion {
    /// Owning letter
    pub letter_id: LetterId,
    /// Position in the letter's history
    pub version_number: VersionNumber,
    /// Body at this version
    pub content: String,
    /// Digest of `content`
    pub content_digest: ContentDigest,
    /// Actor whose edit produced this version
    pub created_by: ActorId,
    /// When the version was written
    pub created_at: Timestamp,
    /// Set only on the version frozen at issuance
    pub verification_token: Option<VerificationToken>,
}

/// Page of the letter listing, newest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterQuery {
    /// Only letters issued under this authority
    pub context: Option<IssuingContext>,
    /// One-based page number
    pub page: u32,
    /// Letters per page
    pub limit: u32,
}

impl LetterQuery {
    /// Page size used when none is given
    pub const DEFAULT_LIMIT: u32 = 50;

    /// First page of every letter
    pub fn all() -> Self {
        Self {
            context: None,
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// Query from raw request values; missing or zero values fall back to page 1 of 50
    pub fn new(context: Option<IssuingContext>, page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            context,
            page: page.filter(|page| *page > 0).unwrap_or(1),
            limit: limit
                .filter(|limit| *limit > 0)
                .unwrap_or(Self::DEFAULT_LIMIT),
        }
    }

    /// Restrict to one issuing context
    pub fn in_context(mut self, context: IssuingContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Letters skipped before this page
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1).saturating_mul(self.limit as usize)
    }

    /// Whether `letter` passes the context filter
    pub fn matches(&self, letter: &Letter) -> bool {
        self.context.map_or(true, |context| letter.context == context)
    }
}

impl Default for LetterQuery {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_replace_missing_and_zero() {
        let query = LetterQuery::new(None, Some(0), None);
        assert_eq!(query, LetterQuery::all());
        assert_eq!(query.offset(), 0);

        let query = LetterQuery::new(Some(IssuingContext::Bcba), Some(3), Some(20));
        assert_eq!(query.offset(), 40);
        assert_eq!(query.context, Some(IssuingContext::Bcba));
    }
}
