//! Resolved identity assertions
//!
//! Session handling happens outside this system. By the time a request reaches
//! the core the caller has been authenticated and reduced to an [`Actor`].

use super::identifiers::ActorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Role held by an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Elevated override for every guarded action
    Admin,
    /// May approve, reject and decide reprint requests
    Approver,
    /// May issue and print
    Issuer,
    /// Drafts letters
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "ADMIN",
            Self::Approver => "APPROVER",
            Self::Issuer => "ISSUER",
            Self::User => "USER",
        })
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identity
    pub id: ActorId,
    /// Roles resolved for the session
    pub roles: BTreeSet<Role>,
}

impl Actor {
    /// Create an actor with the given roles
    pub fn new(id: impl Into<ActorId>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id: id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Whether the actor holds `role`
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the actor holds at least one of `roles`
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }

    /// Whether the actor holds the elevated override role
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}
