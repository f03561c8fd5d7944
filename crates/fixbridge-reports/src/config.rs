//! Flush scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Batch flush settings.
///
/// A flush is due when the buffer holds at least `batch_threshold` reports
/// or `flush_timeout_ms` has elapsed since the last successful flush,
/// whichever comes first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Buffered-report count that triggers a flush. Default: 64.
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,
    /// Maximum time between flushes (ms). Default: 5,000.
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
    /// Re-check interval while neither condition holds (ms). Default: 250.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bound on each store call (ms). Default: 5,000.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_batch_threshold() -> usize {
    64
}

fn default_flush_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            batch_threshold: default_batch_threshold(),
            flush_timeout_ms: default_flush_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl FlushConfig {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
