use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// How long a caller waits for the world thread before giving up on a read.
    pub job_timeout_ms: u64,
    /// The maximum number of reads queued for the world thread.
    pub queue_capacity: usize,
    /// How often the world thread wakes up to refresh availability when idle.
    pub tick_interval_ms: u64,
}

impl ExtractorConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            job_timeout_ms: 5_000,
            queue_capacity: 1024,
            tick_interval_ms: 50,
        }
    }
}
