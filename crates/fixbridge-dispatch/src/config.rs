//! Dispatch scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do with an order whose send attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
    /// Leave the row pending and stop the current batch; the row is retried
    /// once the session gate reopens.
    #[default]
    RequeueOnSessionLoss,
    /// Mark the row dispatched regardless of the send outcome. Reproduces
    /// the legacy at-most-once behavior for compatibility testing.
    FireAndForget,
}

/// Dispatch scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum pending rows fetched per kind per cycle. Default: 32.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Sleep between cycles when all three kind fetches were empty (ms).
    /// Default: 500.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,
    /// Bound on each transport send and store call (ms). Default: 5,000.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    /// Failed-send handling. Default: requeue_on_session_loss.
    #[serde(default)]
    pub policy: DispatchPolicy,
}

fn default_batch_size() -> usize {
    32
}

fn default_idle_delay_ms() -> u64 {
    500
}

fn default_op_timeout_ms() -> u64 {
    5_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            idle_delay_ms: default_idle_delay_ms(),
            op_timeout_ms: default_op_timeout_ms(),
            policy: DispatchPolicy::default(),
        }
    }
}

impl DispatchConfig {
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}
