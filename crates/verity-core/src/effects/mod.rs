//! Effect interfaces
//!
//! Core logic reaches storage, the clock, randomness and rendering only
//! through these traits. Production and test handlers live in
//! `verity-effects` and `verity-testkit`.
//!
//! Components bound on the narrowest set they need; the workflow service
//! takes the composed [`VerityEffects`].

pub mod random;
pub mod render;
pub mod store;
pub mod time;

pub use random::RandomEffects;
pub use render::{RenderEffects, RenderError, RenderRequest, RenderedDocument};
pub use store::{
    CommitGuard, CommitReceipt, LetterMutation, LetterStore, Precondition, StoreError, Write,
};
pub use time::PhysicalTimeEffects;

/// Every effect the letter workflow uses
pub trait VerityEffects:
    LetterStore + PhysicalTimeEffects + RandomEffects + RenderEffects + Send + Sync
{
}

impl<T> VerityEffects for T where
    T: LetterStore + PhysicalTimeEffects + RandomEffects + RenderEffects + Send + Sync
{
}
