//! Poll cadence.

use async_trait::async_trait;
use std::time::Duration;

/// Waits between polls. Owned by the monitor so tests can substitute a
/// clock that never sleeps.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

/// Sleeps a fixed period, measured from when `tick` is called (the end of
/// the previous fetch), not aligned to wall-clock boundaries.
#[derive(Debug, Clone)]
pub struct SleepTicker {
    period: Duration,
}

impl SleepTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Ticker for SleepTicker {
    async fn tick(&mut self) {
        tokio::time::sleep(self.period).await;
    }
}
