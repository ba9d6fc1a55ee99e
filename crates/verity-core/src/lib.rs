//! # Verity Core
//!
//! Shared vocabulary for letter issuance and verification: domain types, the
//! unified error, tag normalization, content fingerprinting, configuration
//! and the effect interfaces every other crate is written against.

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod fingerprint;
pub mod hash;
pub mod tags;
pub mod types;

pub use config::{ConfigLayers, VerityConfig};
pub use errors::{Result as VerityResult, VerityError};
pub use fingerprint::{content_digest, fingerprint, fingerprint_parts, FingerprintInput};
pub use hash::{ContentDigest, Fingerprint};
pub use tags::{normalize_tag_ids, TagSet};
pub use types::*;
