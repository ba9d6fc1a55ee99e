//! Operating-system randomness
//!
//! Verification tokens are random v4 UUIDs drawn from the thread-local CSPRNG.

use async_trait::async_trait;
use rand::RngCore;
use uuid::Uuid;
use verity_core::effects::RandomEffects;

/// Random handler backed by `rand::thread_rng`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl OsRandom {
    /// Create a random handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RandomEffects for OsRandom {
    async fn random_uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}
