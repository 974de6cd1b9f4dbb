//! Tunables for the authority and its synchronizing consumers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Complete runtime configuration; every field falls back to its default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkirmishConfig {
    /// Authority settings.
    pub authority: AuthorityConfig,
    /// Consumer synchronization settings.
    pub sync: SyncConfig,
}

/// Settings of the authoritative battle host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Seed of the generator every random roll is drawn from.
    pub seed: u64,
    /// Largest number of deltas returned by a single pull.
    pub max_pull_batch: u32,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            max_pull_batch: 256,
        }
    }
}

/// Settings of a polling consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lag, in deltas, beyond which the consumer replaces its state with a snapshot.
    pub fast_forward_threshold: u32,
    /// Consecutive transport failures tolerated before the consumer disconnects.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_backoff_ms: u64,
    /// Upper bound on the delay between retries.
    pub max_backoff_ms: u64,
    /// Applied deltas kept for presentation; the oldest are dropped beyond this.
    pub max_playback: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fast_forward_threshold: 32,
            max_attempts: 5,
            base_backoff_ms: 250,
            max_backoff_ms: 8_000,
            max_playback: 1_024,
        }
    }
}

impl SyncConfig {
    /// Delay before retry number `attempt`, doubling from the base up to the cap.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(63);
        let delay = self
            .base_backoff_ms
            .saturating_mul(1_u64 << doublings)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}
