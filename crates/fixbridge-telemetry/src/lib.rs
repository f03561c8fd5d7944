//! Prometheus metrics and structured logging for fixbridge.
//!
//! - Prometheus counters/gauges for dispatch, flush and notification activity
//! - Structured logging with tracing (JSON in production, pretty in dev)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
