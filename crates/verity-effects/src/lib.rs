//! # Verity Effects
//!
//! Handlers for the effect interfaces declared in `verity_core::effects`.
//! Deterministic test doubles live in `verity-testkit`.

#![forbid(unsafe_code)]

pub mod random;
pub mod render;
pub mod store;
pub mod system;
pub mod time;

pub use random::OsRandom;
pub use render::TextRenderer;
pub use store::MemoryLetterStore;
pub use system::VerityEffectSystem;
pub use time::SystemClock;
