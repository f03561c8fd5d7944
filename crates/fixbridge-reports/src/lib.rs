//! Execution-report intake for fixbridge.
//!
//! Three pieces sit between the transport's inbound channel and the report
//! store:
//! - [`ReportBuffer`]: a concurrency-safe, unbounded collector of reports
//!   awaiting durable persistence
//! - [`run_ingest`]: the task that receives decoded inbound reports,
//!   resolves client attribution, and buffers the result
//! - [`FlushScheduler`]: drains the buffer into the store once a size or
//!   time threshold is met
//!
//! The buffer is the only state shared between producer and consumer; it is
//! constructed once at startup and injected into both.

pub mod buffer;
pub mod config;
pub mod flusher;
pub mod ingest;

pub use buffer::ReportBuffer;
pub use config::FlushConfig;
pub use flusher::FlushScheduler;
pub use ingest::run_ingest;
