//! # Verity Ledger
//!
//! Per-letter version history. Every content change becomes a numbered,
//! digested, immutable version; numbers start at 1 and never skip.

#![forbid(unsafe_code)]

pub mod ledger;

pub use ledger::{
    version_record, BrokenLink, LedgerAudit, LedgerEffects, RecordedVersion, VersionLedger,
};
