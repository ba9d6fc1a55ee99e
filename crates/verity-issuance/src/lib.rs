//! # Verity Issuance
//!
//! Freezing an approved letter into an issued document, and controlling how
//! often that document may be printed afterwards.

#![forbid(unsafe_code)]

pub mod coordinator;
pub mod printing;

pub use coordinator::{IssuanceCoordinator, IssuanceEffects, IssueCommand, IssueReceipt};
pub use printing::{PrintControl, PrintOutcome, PRINT_LIMIT_REACHED};
