//! Execution-report mailbox contract.

use std::sync::Arc;

use fixbridge_core::ExecutionReport;

use crate::error::StoreResult;
use crate::BoxFuture;

/// Durable mailbox of execution-report rows.
pub trait ReportStore: Send + Sync {
    /// Persists one drained buffer snapshot. All-or-nothing: either every
    /// report in the batch is stored or none is, so a failed flush can be
    /// retried without duplicating rows.
    fn persist_batch(&self, reports: Vec<ExecutionReport>) -> BoxFuture<'_, StoreResult<()>>;

    /// Fetches up to `limit` rows not yet fanned out, oldest first.
    fn fetch_unnotified(&self, limit: usize) -> BoxFuture<'_, StoreResult<Vec<ExecutionReport>>>;

    /// Flips a row's notified flag after fan-out. Once flipped the row is
    /// excluded from every future `fetch_unnotified` result.
    fn mark_notified(&self, id: i64) -> BoxFuture<'_, StoreResult<()>>;
}

/// Arc wrapper for ReportStore trait objects.
pub type DynReportStore = Arc<dyn ReportStore>;
