//! System clock handler

use async_trait::async_trait;
use verity_core::effects::PhysicalTimeEffects;
use verity_core::Timestamp;

/// Wall clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a system clock
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for SystemClock {
    async fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}
