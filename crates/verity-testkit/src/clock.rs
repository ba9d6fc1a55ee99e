//! Controllable clock

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use verity_core::effects::PhysicalTimeEffects;
use verity_core::Timestamp;

/// Clock whose time only moves when told to
///
/// With a non-zero step every reading advances the clock afterwards, which
/// gives each record written in a scenario a distinct timestamp.
#[derive(Debug, Clone)]
pub struct ControllableClock {
    current: Arc<Mutex<Timestamp>>,
    step: Duration,
}

impl Default for ControllableClock {
    fn default() -> Self {
        Self::new(epoch())
    }
}

/// Fixed starting instant used by fixtures
pub fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

impl ControllableClock {
    /// Frozen clock at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
            step: Duration::zero(),
        }
    }

    /// Clock advancing by `step` after every reading
    pub fn ticking(start: Timestamp, step: Duration) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
            step,
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap();
        *current += by;
    }

    /// Set absolute time
    pub fn set(&self, at: Timestamp) {
        *self.current.lock().unwrap() = at;
    }

    /// Current time without advancing
    pub fn peek(&self) -> Timestamp {
        *self.current.lock().unwrap()
    }
}

#[async_trait]
impl PhysicalTimeEffects for ControllableClock {
    async fn now(&self) -> Timestamp {
        let mut current = self.current.lock().unwrap();
        let now = *current;
        *current += self.step;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ticking_clock_advances_per_read() {
        let clock = ControllableClock::ticking(epoch(), Duration::seconds(1));
        let a = clock.now().await;
        let b = clock.now().await;
        assert_eq!(b - a, Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_frozen_clock_only_moves_on_advance() {
        let clock = ControllableClock::default();
        assert_eq!(clock.now().await, clock.now().await);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.peek(), epoch() + Duration::minutes(5));
    }
}
