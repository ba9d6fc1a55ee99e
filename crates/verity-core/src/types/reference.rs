//! Reference data owned by the hosting database

use super::identifiers::{ActorId, CommitteeId, DepartmentId, TagId};
use super::letter::IssuingContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Department a letter is written for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// Department identifier
    pub id: DepartmentId,
    /// Display name shown on verification
    pub name: String,
    /// Issuing authority the department belongs to
    pub context: IssuingContext,
}

/// Classification tag offered when drafting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag identifier, as carried in a letter's tag set
    pub id: TagId,
    /// Display name
    pub name: String,
    /// Issuing authority the tag belongs to
    pub context: IssuingContext,
}

/// Approval committee and its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    /// Committee identifier
    pub id: CommitteeId,
    /// Display name
    pub name: String,
    /// Issuing authority the committee sits under
    pub context: IssuingContext,
    /// Actors allowed to approve on the committee's behalf
    pub members: BTreeSet<ActorId>,
}

impl Committee {
    /// Whether `actor` may approve on behalf of this committee
    pub fn is_member(&self, actor: &ActorId) -> bool {
        self.members.contains(actor)
    }
}
