//! Shared fixtures
//!
//! Reference data, actors and a fully wired deterministic effect system.

use crate::clock::{epoch, ControllableClock};
use crate::random::SeededRandom;
use chrono::Duration;
use verity_core::{
    Actor, ActorId, Committee, CommitteeApproval, CommitteeId, Department, DepartmentId,
    DirectApproval, IssuingContext, Letter, LetterId, LetterStatus, Role, Tag, TagId, TagSet,
    Timestamp,
};
use verity_effects::{MemoryLetterStore, TextRenderer, VerityEffectSystem};

/// Department in the COMPANY context
pub const DEPARTMENT_ID: &str = "dept-9";
/// Department in the BCBA context
pub const BCBA_DEPARTMENT_ID: &str = "dept-bcba";
/// Committee in the COMPANY context
pub const COMMITTEE_ID: &str = "committee-1";

/// Deterministic effect system used across test suites
pub type TestEffects<D = TextRenderer> =
    VerityEffectSystem<MemoryLetterStore, ControllableClock, SeededRandom, D>;

/// Fixture time shifted by `seconds`
pub fn at(seconds: i64) -> Timestamp {
    epoch() + Duration::seconds(seconds)
}

/// Actor with ADMIN
pub fn admin() -> Actor {
    Actor::new("admin", [Role::Admin])
}

/// Actor with APPROVER
pub fn approver() -> Actor {
    Actor::new("approver", [Role::Approver])
}

/// Actor with ISSUER
pub fn issuer() -> Actor {
    Actor::new("issuer", [Role::Issuer])
}

/// Plain user who drafts letters
pub fn author() -> Actor {
    Actor::new("author", [Role::User])
}

/// Plain user sitting on the fixture committee
pub fn committee_member() -> Actor {
    Actor::new("member", [Role::User])
}

/// Plain user with no relation to any fixture letter
pub fn outsider() -> Actor {
    Actor::new("outsider", [Role::User])
}

/// COMPANY department
pub fn department() -> Department {
    Department {
        id: DepartmentId::new(DEPARTMENT_ID),
        name: "Clinical Services".to_string(),
        context: IssuingContext::Company,
    }
}

/// BCBA department
pub fn bcba_department() -> Department {
    Department {
        id: DepartmentId::new(BCBA_DEPARTMENT_ID),
        name: "Board Certification".to_string(),
        context: IssuingContext::Bcba,
    }
}

/// Committee whose only member is [`committee_member`]
pub fn committee() -> Committee {
    Committee {
        id: CommitteeId::new(COMMITTEE_ID),
        name: "Review Committee".to_string(),
        context: IssuingContext::Company,
        members: [committee_member().id].into_iter().collect(),
    }
}

/// Tags `alpha` and `beta` under COMPANY, `board` under BCBA
pub fn tags() -> Vec<Tag> {
    [
        ("alpha", IssuingContext::Company),
        ("beta", IssuingContext::Company),
        ("board", IssuingContext::Bcba),
    ]
    .into_iter()
    .map(|(id, context)| Tag {
        id: TagId::new(id),
        name: id.to_string(),
        context,
    })
    .collect()
}

/// Register the fixture departments, tags and committee
pub async fn seed_reference_data(store: &MemoryLetterStore) {
    store.insert_department(department()).await;
    store.insert_department(bcba_department()).await;
    for tag in tags() {
        store.insert_tag(tag).await;
    }
    store.insert_committee(committee()).await;
}

/// Deterministic effects with seeded reference data and a one-second ticking clock
pub async fn test_effects() -> TestEffects {
    test_effects_with_renderer(TextRenderer::new()).await
}

/// Same as [`test_effects`] with a custom renderer
pub async fn test_effects_with_renderer<D>(renderer: D) -> TestEffects<D> {
    let store = MemoryLetterStore::new();
    seed_reference_data(&store).await;
    VerityEffectSystem::new(
        store,
        ControllableClock::ticking(epoch(), Duration::seconds(1)),
        SeededRandom::default(),
        renderer,
    )
}

/// Letter in `status` with the fingerprint fixture's content and tags
pub fn letter_fixture(id: &str, status: LetterStatus) -> Letter {
    Letter {
        id: LetterId::new(id),
        context: IssuingContext::Company,
        department_id: DepartmentId::new(DEPARTMENT_ID),
        content: "Hello world".to_string(),
        tag_ids: TagSet::from_ids(["alpha", "beta"]),
        status,
        committee_id: None,
        created_by: author().id,
        created_at: epoch(),
        updated_at: epoch(),
        letter_number: None,
        rejection_reason: None,
        rejected_at: None,
        revoked_at: None,
    }
}

/// Direct approval by `approver`
pub fn direct_approval(letter: &str, approver: &str, at: Option<Timestamp>) -> DirectApproval {
    DirectApproval {
        letter_id: LetterId::new(letter),
        approver_id: ActorId::new(approver),
        comment: None,
        approved_at: at,
    }
}

/// Approval recorded for the fixture committee by `approver`
pub fn committee_approval(
    letter: &str,
    approver: &str,
    at: Option<Timestamp>,
) -> CommitteeApproval {
    CommitteeApproval {
        letter_id: LetterId::new(letter),
        committee_id: CommitteeId::new(COMMITTEE_ID),
        approver_id: ActorId::new(approver),
        comment: None,
        approved_at: at,
    }
}
