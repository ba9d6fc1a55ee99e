//! Seeded randomness

use async_trait::async_trait;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use verity_core::effects::RandomEffects;

/// Reproducible random handler
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SeededRandom {
    /// Create from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new(42)
    }
}

#[async_trait]
impl RandomEffects for SeededRandom {
    async fn random_uuid(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.rng.lock().unwrap().fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}
