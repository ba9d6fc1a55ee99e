//! Identifier types
//!
//! Letters, actors, departments and committees are identified by opaque
//! strings handed over by the hosting database. Records minted by this
//! system (issuances, reprint requests, verification tokens) use UUIDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create from any string-like value
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the inner string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create from a UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

string_id!(
    /// Letter identifier
    LetterId
);

string_id!(
    /// Identity of a human actor (creator, approver, issuer)
    ActorId
);

string_id!(
    /// Department reference
    DepartmentId
);

string_id!(
    /// Approval committee reference
    CommitteeId
);

string_id!(
    /// Tag reference
    TagId
);

uuid_id!(
    /// Issuance record identifier
    IssuanceId
);

uuid_id!(
    /// Reprint request identifier
    PrintRequestId
);

uuid_id!(
    /// Delivery acknowledgement identifier
    AcknowledgementId
);

uuid_id!(
    /// Opaque random token embedded in the verification URL / QR code
    ///
    /// Distinct from the content fingerprint: it carries no information about
    /// the letter and cannot be recomputed from it.
    VerificationToken
);

/// Position of a version in a letter's history, starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionNumber(pub u32);

impl VersionNumber {
    /// Head of a letter with no versions yet
    pub const NONE: Self = Self(0);

    /// Create a version number
    pub fn new(n: u32) -> Self {
        Self(n)
    }

    /// Get the inner value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Next version in sequence; `None` on overflow
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Previous version in sequence; `None` below 1
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<u32> for VersionNumber {
    fn from(n: u32) -> Self {
        Self(n)
    }
}
