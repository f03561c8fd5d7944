//! Durable mailbox contract for the fixbridge pipeline.
//!
//! The schedulers never talk to a database directly; they consume the
//! [`OrderStore`] and [`ReportStore`] traits, which express ordering and
//! predicates only (no SQL dialect implied). The in-memory implementations
//! in [`memory`] back tests and the single-process reference deployment; a
//! SQL-backed implementation plugs in behind the same traits.

pub mod error;
pub mod memory;
pub mod order_store;
pub mod report_store;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryOrderStore, MemoryReportStore};
pub use order_store::{DynOrderStore, OrderStore};
pub use report_store::{DynReportStore, ReportStore};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
