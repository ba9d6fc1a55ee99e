//! Verification key dispatch
//!
//! A verifier presents one string. Its format alone decides how it is looked
//! up: 64 lowercase hex characters are a content fingerprint, a hyphenated
//! UUID is a verification token. Anything else resolves to nothing.

use std::fmt;
use uuid::Uuid;
use verity_core::hash::is_hex_digest;
use verity_core::{Fingerprint, VerificationToken};

/// Length of a hyphenated UUID
const HYPHENATED_UUID_LEN: usize = 36;

/// Parsed verification key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationKey {
    /// Structural fingerprint printed on the document
    Fingerprint(Fingerprint),
    /// Opaque token from the verification URL
    Token(VerificationToken),
}

impl VerificationKey {
    /// Parse a presented key; `None` for every unrecognized format
    pub fn parse(raw: &str) -> Option<Self> {
        if is_hex_digest(raw) {
            return raw.parse().ok().map(Self::Fingerprint);
        }
        if raw.len() == HYPHENATED_UUID_LEN {
            return Uuid::try_parse(raw)
                .ok()
                .map(|uuid| Self::Token(VerificationToken::from_uuid(uuid)));
        }
        None
    }

    /// Lookup kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fingerprint(_) => "fingerprint",
            Self::Token(_) => "token",
        }
    }
}

impl fmt::Display for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fingerprint(fingerprint) => write!(f, "{fingerprint}"),
            Self::Token(token) => write!(f, "{token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const FINGERPRINT: &str = "24c774facebb5311a69f31d2e1017df8cb07ce498f137226a47de905b9a7e7c4";

    #[test]
    fn test_dispatch_by_format() {
        assert_matches!(
            VerificationKey::parse(FINGERPRINT),
            Some(VerificationKey::Fingerprint(f)) if f.to_hex() == FINGERPRINT
        );
        assert_matches!(
            VerificationKey::parse("6f1d1c58-2c8e-4f0a-9a7e-1f2b3c4d5e6f"),
            Some(VerificationKey::Token(_))
        );
    }

    #[test]
    fn test_malformed_keys_resolve_to_nothing() {
        let upper = FINGERPRINT.to_uppercase();
        for raw in [
            "",
            "not-a-key",
            upper.as_str(),
            &FINGERPRINT[..63],
            "6f1d1c582c8e4f0a9a7e1f2b3c4d5e6f",
            "6f1d1c58-2c8e-4f0a-9a7e-1f2b3c4d5e6g",
        ] {
            assert_eq!(VerificationKey::parse(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn test_display_round_trips() {
        let key = VerificationKey::parse(FINGERPRINT).unwrap();
        assert_eq!(key.to_string(), FINGERPRINT);
        assert_eq!(key.kind(), "fingerprint");
    }
}
