//! Shared-secret access gate for verification lookups

use subtle::ConstantTimeEq;
use verity_core::{VerityConfig, VerityError, VerityResult};

/// Optional shared secret guarding the verification endpoint
#[derive(Clone, Default)]
pub struct AccessGate {
    expected: Option<Vec<u8>>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl AccessGate {
    /// Gate that admits every caller
    pub fn open() -> Self {
        Self::default()
    }

    /// Gate requiring `key`
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            expected: Some(key.into().into_bytes()),
        }
    }

    /// Gate configured from `verify_access_key`
    pub fn from_config(config: &VerityConfig) -> Self {
        match &config.verify_access_key {
            Some(key) => Self::with_key(key.clone()),
            None => Self::open(),
        }
    }

    /// Whether a key is required
    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    /// Admit or reject a caller presenting `presented`
    pub fn check(&self, presented: Option<&str>) -> VerityResult<()> {
        let Some(expected) = &self.expected else {
            return Ok(());
        };
        let Some(presented) = presented else {
            return Err(VerityError::unauthorized("verification access key required"));
        };
        if bool::from(presented.as_bytes().ct_eq(expected)) {
            Ok(())
        } else {
            Err(VerityError::unauthorized("verification access key rejected"))
        }
    }
}
