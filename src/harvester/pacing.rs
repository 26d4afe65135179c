//! Politeness pacing between requests
//!
//! The harvest never overlaps requests. Between two fetches it sleeps for a
//! random delay inside the configured bounds, and wakes early only to honor
//! cancellation.

use crate::config::HarvestConfig;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds of the randomized pause between two fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl Pacer {
    /// Creates a pacer; inverted bounds are swapped
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms: min_delay_ms.min(max_delay_ms),
            max_delay_ms: min_delay_ms.max(max_delay_ms),
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    /// Draws a delay uniformly from `[min, max]`
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.min_delay_ms..=self.max_delay_ms))
    }

    /// Sleeps for a random delay
    ///
    /// Returns `false` if `cancel` fired before the delay elapsed.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        let delay = self.next_delay(&mut rand::rng());
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }

        tracing::debug!("Waiting {:.1} seconds...", delay.as_secs_f64());
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}
