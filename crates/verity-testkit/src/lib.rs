//! Verity testing infrastructure
//!
//! Deterministic effect handlers, fault-injecting store wrappers, fixtures
//! and proptest strategies shared by the test suites of every Verity crate.
//!
//! ```toml
//! [dev-dependencies]
//! verity-testkit = { path = "../verity-testkit" }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod clock;
pub mod faults;
pub mod fixtures;
pub mod random;
pub mod strategies;

pub use clock::{epoch, ControllableClock};
pub use faults::{FailingRenderer, FaultyStore, InterleavingStore};
pub use fixtures::*;
pub use random::SeededRandom;
