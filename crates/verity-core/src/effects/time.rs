//! Wall-clock time

use crate::types::Timestamp;
use async_trait::async_trait;

/// Source of the timestamps written on records
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current wall-clock time
    async fn now(&self) -> Timestamp;
}
