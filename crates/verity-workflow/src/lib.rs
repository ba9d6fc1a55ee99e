//! # Verity Workflow
//!
//! The letter lifecycle as one service: drafting and editing with a version
//! per change, direct and committee approval, rejection and revocation,
//! issuance with document rendering, print control, delivery
//! acknowledgements, listings and public verification.
//!
//! ```rust,ignore
//! use verity_workflow::{LetterService, NewLetter};
//!
//! let service = LetterService::new(effects, VerityConfig::default())?;
//! let letter = service.create_letter(&author, draft).await?;
//! service.approve(&approver, &letter.id, None).await?;
//! let outcome = service.issue(&issuer, &letter.id, Channel::Email).await?;
//! let verdict = service.verify(None, &outcome.receipt.fingerprint.to_hex()).await?;
//! ```

#![forbid(unsafe_code)]

pub mod commands;
pub mod guards;
pub mod service;

pub use commands::{IssueOutcome, LetterEdit, NewAcknowledgement, NewLetter};
pub use guards::Operation;
pub use service::LetterService;
