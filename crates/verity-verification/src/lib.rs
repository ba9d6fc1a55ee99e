//! # Verity Verification
//!
//! Answers "is this document genuine?" for a presented key. The pieces are
//! layered: an access [`gate`], key parsing in [`key`], lookup and tamper
//! checking in [`verifier`], approval selection in [`reconcile`] and the
//! public response in [`verdict`]. Everything except the verifier is pure.

#![forbid(unsafe_code)]

pub mod gate;
pub mod key;
pub mod reconcile;
pub mod verdict;
pub mod verifier;

pub use gate::AccessGate;
pub use key::VerificationKey;
pub use reconcile::reconcile;
pub use verdict::{
    build_verdict, DocumentDetails, VerdictStatus, VerificationResult, VerificationSnapshot,
};
pub use verifier::Verifier;
