//! SHA-256 hashing and digest newtypes
//!
//! Hashing is pure and synchronous, so it lives outside the effect system.
//! This module is the single place where the algorithm is named; everything
//! else goes through [`hash`].
//!
//! Two digest granularities exist and are kept apart by type:
//!
//! - [`ContentDigest`]: hash over the raw letter body, minted by the version ledger
//! - [`Fingerprint`]: hash over the canonical structural record, minted at issuance
//!
//! Both render as 64 lowercase hexadecimal characters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of a rendered digest in hex characters
pub const HEX_DIGEST_LEN: usize = 64;

/// Hash arbitrary bytes to a 32-byte SHA-256 digest
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Whether `candidate` has the exact shape of a rendered digest
pub fn is_hex_digest(candidate: &str) -> bool {
    candidate.len() == HEX_DIGEST_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Error returned when a string is not a rendered digest
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 64 lowercase hex characters, got {0:?}")]
pub struct DigestParseError(pub String);

fn parse_hex32(s: &str) -> Result<[u8; 32], DigestParseError> {
    if !is_hex_digest(s) {
        return Err(DigestParseError(s.to_string()));
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(s, &mut out).map_err(|_| DigestParseError(s.to_string()))?;
    Ok(out)
}

macro_rules! hex_digest {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw digest bytes
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw digest bytes
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex rendering
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = DigestParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex32(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_digest!(
    /// SHA-256 over a letter body alone
    ContentDigest
);

hex_digest!(
    /// SHA-256 over the canonical record binding identity, version, context and body
    Fingerprint
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_vector() {
        let digest = ContentDigest::from_bytes(hash(b"abc"));
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_parse_round_trip() {
        let fp = Fingerprint::from_bytes(hash(b"letter"));
        let parsed: Fingerprint = fp.to_hex().parse().unwrap();
        assert_eq!(parsed, fp);
    }

    #[test]
    fn test_rejects_uppercase_and_wrong_length() {
        let upper = "BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD";
        assert!(!is_hex_digest(upper));
        assert!(upper.parse::<Fingerprint>().is_err());
        assert!("abc".parse::<ContentDigest>().is_err());
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let digest = ContentDigest::from_bytes(hash(b"abc"));
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest.to_hex()));
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
