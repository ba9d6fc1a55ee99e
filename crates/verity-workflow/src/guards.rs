//! Authorization guards
//!
//! Every service operation names an [`Operation`]; the guard decides whether
//! the actor may perform it before any state is read for writing. Checks that
//! depend on the letter (creator rights, committee membership) take the
//! letter as loaded by the caller.

use tracing::debug;
use verity_core::{Actor, Committee, Letter, Role, VerityError, VerityResult};

/// Operations subject to role checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Draft a new letter
    Create,
    /// Change a draft
    Edit,
    /// Direct approval
    Approve,
    /// Committee approval
    CommitteeApprove,
    /// Reject a draft or approved letter
    Reject,
    /// Revoke an approved or issued letter
    Revoke,
    /// Issue an approved letter
    Issue,
    /// Print an issued letter
    Print,
    /// Ask for another print
    RequestReprint,
    /// Approve or reject a reprint request
    DecideReprint,
    /// Render the document of an issued letter again
    Render,
    /// Record that an issued letter was delivered
    Acknowledge,
}

impl Operation {
    /// Roles that grant the operation regardless of the letter
    pub fn roles(&self) -> &'static [Role] {
        match self {
            Self::Create => &[Role::Admin, Role::Approver, Role::Issuer, Role::User],
            Self::Edit | Self::Revoke | Self::CommitteeApprove => &[Role::Admin],
            Self::Approve | Self::Reject | Self::DecideReprint => &[Role::Admin, Role::Approver],
            Self::Issue | Self::Print | Self::RequestReprint | Self::Render | Self::Acknowledge => {
                &[Role::Admin, Role::Issuer]
            }
        }
    }

    /// Whether the letter's creator may perform the operation without a role
    pub fn creator_allowed(&self) -> bool {
        matches!(
            self,
            Self::Edit | Self::Print | Self::RequestReprint | Self::Render | Self::Acknowledge
        )
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Create => "create letters",
            Self::Edit => "edit this letter",
            Self::Approve => "approve letters",
            Self::CommitteeApprove => "approve for this committee",
            Self::Reject => "reject letters",
            Self::Revoke => "revoke letters",
            Self::Issue => "issue letters",
            Self::Print => "print this letter",
            Self::RequestReprint => "request reprints of this letter",
            Self::DecideReprint => "decide reprint requests",
            Self::Render => "render this letter",
            Self::Acknowledge => "acknowledge this letter",
        }
    }
}

/// Authorize `actor` for an operation that does not depend on a letter
pub fn authorize(actor: &Actor, operation: Operation) -> VerityResult<()> {
    if actor.has_any_role(operation.roles()) {
        return Ok(());
    }
    denied(actor, operation)
}

/// Authorize `actor` for an operation on `letter`
pub fn authorize_on(actor: &Actor, operation: Operation, letter: &Letter) -> VerityResult<()> {
    if actor.has_any_role(operation.roles()) {
        return Ok(());
    }
    if operation.creator_allowed() && letter.created_by == actor.id {
        return Ok(());
    }
    denied(actor, operation)
}

/// Authorize `actor` to approve on behalf of `committee`
pub fn authorize_committee(actor: &Actor, committee: &Committee) -> VerityResult<()> {
    if actor.is_admin() || committee.is_member(&actor.id) {
        return Ok(());
    }
    denied(actor, Operation::CommitteeApprove)
}

fn denied(actor: &Actor, operation: Operation) -> VerityResult<()> {
    debug!(actor = %actor.id, ?operation, "operation denied");
    Err(VerityError::permission_denied(format!(
        "{} may not {}",
        actor.id,
        operation.describe()
    )))
}
