//! Content fingerprinting
//!
//! The issuance fingerprint binds a letter's identity, version, issuing
//! context, department, tags and body into one SHA-256 digest. The canonical
//! byte form is compact JSON with a fixed field order:
//!
//! ```text
//! {"letter_id":..,"version":..,"context":..,"department_id":..,"tag_ids":[..],"content":..}
//! ```
//!
//! Identical inputs always produce identical bytes. Nothing is coerced or
//! dropped; in particular `tag_ids` is hashed in the order given, so callers
//! pass a normalized [`TagSet`].

use crate::errors::{Result, VerityError};
use crate::hash::{hash, ContentDigest, Fingerprint};
use crate::tags::TagSet;
use crate::types::{IssuingContext, Letter, VersionNumber};
use serde::Serialize;

/// Canonical record hashed into a [`Fingerprint`]; field order is part of the format
#[derive(Debug, Serialize)]
struct CanonicalRecord<'a> {
    letter_id: &'a str,
    version: u32,
    context: &'a str,
    department_id: &'a str,
    tag_ids: &'a [String],
    content: &'a str,
}

/// Inputs of a structural fingerprint
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    /// Letter identifier
    pub letter_id: &'a str,
    /// Version being fingerprinted
    pub version: VersionNumber,
    /// Issuing context wire form
    pub context: &'a str,
    /// Department identifier
    pub department_id: &'a str,
    /// Normalized tag ids
    pub tag_ids: &'a TagSet,
    /// Letter body
    pub content: &'a str,
}

impl<'a> FingerprintInput<'a> {
    /// Inputs taken from a letter's current state at `version`
    pub fn for_letter(letter: &'a Letter, version: VersionNumber) -> Self {
        Self {
            letter_id: letter.id.as_str(),
            version,
            context: letter.context.as_str(),
            department_id: letter.department_id.as_str(),
            tag_ids: &letter.tag_ids,
            content: &letter.content,
        }
    }

    /// Same inputs with a different body
    pub fn with_content(self, content: &'a str) -> Self {
        Self { content, ..self }
    }

    /// Canonical byte form
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let record = CanonicalRecord {
            letter_id: self.letter_id,
            version: self.version.value(),
            context: self.context,
            department_id: self.department_id,
            tag_ids: self.tag_ids.as_slice(),
            content: self.content,
        };
        serde_json::to_vec(&record)
            .map_err(|e| VerityError::serialization(format!("canonical record: {e}")))
    }
}

/// Fingerprint the given inputs
pub fn fingerprint(input: &FingerprintInput<'_>) -> Result<Fingerprint> {
    let bytes = input.canonical_bytes()?;
    Ok(Fingerprint::from_bytes(hash(&bytes)))
}

/// Fingerprint from loose parts
pub fn fingerprint_parts(
    letter_id: &str,
    version: VersionNumber,
    context: IssuingContext,
    department_id: &str,
    tag_ids: &TagSet,
    content: &str,
) -> Result<Fingerprint> {
    fingerprint(&FingerprintInput {
        letter_id,
        version,
        context: context.as_str(),
        department_id,
        tag_ids,
        content,
    })
}

/// Digest over a body alone, as stored on every version
pub fn content_digest(content: &str) -> ContentDigest {
    ContentDigest::from_bytes(hash(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FIXTURE_HEX: &str = "24c774facebb5311a69f31d2e1017df8cb07ce498f137226a47de905b9a7e7c4";

    fn fixture_tags() -> TagSet {
        TagSet::from_ids(["alpha", "beta"])
    }

    fn fixture(content: &str) -> Fingerprint {
        fingerprint_parts(
            "letter-123",
            VersionNumber(2),
            IssuingContext::Company,
            "dept-9",
            &fixture_tags(),
            content,
        )
        .unwrap()
    }

    #[test]
    fn test_fixture_digest_is_stable() {
        assert_eq!(fixture("Hello world").to_hex(), FIXTURE_HEX);
        assert_eq!(fixture("Hello world"), fixture("Hello world"));
    }

    #[test]
    fn test_canonical_bytes_layout() {
        let tags = fixture_tags();
        let input = FingerprintInput {
            letter_id: "letter-123",
            version: VersionNumber(2),
            context: "COMPANY",
            department_id: "dept-9",
            tag_ids: &tags,
            content: "Hello world",
        };
        let bytes = input.canonical_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"letter_id":"letter-123","version":2,"context":"COMPANY","department_id":"dept-9","tag_ids":["alpha","beta"],"content":"Hello world"}"#
        );
    }

    #[test]
    fn test_single_field_changes_digest() {
        let base = fixture("Hello world");
        assert_ne!(base, fixture("Hello world!"));
        assert_ne!(base, fixture("Hello  world"));

        let tags = fixture_tags();
        let other_version = fingerprint_parts(
            "letter-123",
            VersionNumber(3),
            IssuingContext::Company,
            "dept-9",
            &tags,
            "Hello world",
        )
        .unwrap();
        let other_context = fingerprint_parts(
            "letter-123",
            VersionNumber(2),
            IssuingContext::Bcba,
            "dept-9",
            &tags,
            "Hello world",
        )
        .unwrap();
        let other_dept = fingerprint_parts(
            "letter-123",
            VersionNumber(2),
            IssuingContext::Company,
            "dept-10",
            &tags,
            "Hello world",
        )
        .unwrap();
        assert_ne!(base, other_version);
        assert_ne!(base, other_context);
        assert_ne!(base, other_dept);
    }

    #[test]
    fn test_identical_text_different_structure_is_disambiguated() {
        let tags = TagSet::from_ids(["alpha"]);
        let with_one_tag = fingerprint_parts(
            "letter-123",
            VersionNumber(2),
            IssuingContext::Company,
            "dept-9",
            &tags,
            "Hello world",
        )
        .unwrap();
        assert_ne!(with_one_tag, fixture("Hello world"));
        assert_eq!(
            content_digest("Hello world"),
            content_digest("Hello world"),
            "the body-only digest cannot tell the two apart"
        );
    }

    #[test]
    fn test_content_digest_known_vector() {
        assert_eq!(
            content_digest("some content").to_hex(),
            "290f493c44f5d63d06b374d0a5abd292fae38b92cab2fae5efefe1b0e9347f56"
        );
    }

    proptest! {
        #[test]
        fn fingerprint_is_deterministic(
            letter_id in "[a-z0-9-]{1,16}",
            version in 1u32..1000,
            content in ".{0,64}",
            tags in prop::collection::vec("[a-z]{1,4}", 0..4),
        ) {
            let tags = TagSet::from_ids(tags);
            let a = fingerprint_parts(&letter_id, VersionNumber(version), IssuingContext::Bcba, "dept", &tags, &content).unwrap();
            let b = fingerprint_parts(&letter_id, VersionNumber(version), IssuingContext::Bcba, "dept", &tags, &content).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn appending_to_content_changes_fingerprint(content in ".{0,64}", suffix in ".{1,4}") {
            let tags = TagSet::empty();
            let a = fingerprint_parts("l", VersionNumber(1), IssuingContext::Company, "d", &tags, &content).unwrap();
            let extended = format!("{content}{suffix}");
            let b = fingerprint_parts("l", VersionNumber(1), IssuingContext::Company, "d", &tags, &extended).unwrap();
            prop_assert_ne!(a, b);
        }
    }
}
