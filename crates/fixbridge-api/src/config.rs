//! API and notification configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP/WebSocket server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen port. Default: 8080.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-subscriber broadcast queue capacity; a subscriber that falls
    /// further behind skips missed notices. Default: 256.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Notification scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Maximum unnotified rows fetched per cycle. Default: 32.
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,
    /// Sleep between cycles when the poll returned nothing (ms).
    /// Default: 500.
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,
    /// Bound on each store call (ms). Default: 5,000.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

fn default_batch_threshold() -> usize {
    32
}

fn default_poll_delay_ms() -> u64 {
    500
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            batch_threshold: default_batch_threshold(),
            poll_delay_ms: default_poll_delay_ms(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl NotifyConfig {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
