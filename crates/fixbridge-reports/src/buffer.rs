//! The report intake buffer.

use fixbridge_core::ExecutionReport;
use parking_lot::Mutex;

/// Concurrency-safe collector of execution reports awaiting persistence.
///
/// Unbounded by design: a burst of inbound reports from the venue must not
/// be rejected or throttled, so `add` never blocks beyond the internal lock
/// and never drops. Insertion order is irrelevant; the store assigns the
/// durable ordering at persist time.
#[derive(Debug, Default)]
pub struct ReportBuffer {
    inner: Mutex<Vec<ExecutionReport>>,
}

impl ReportBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one report. Safe to call concurrently with a drain; a racing
    /// add lands in the next drain, never lost, never duplicated.
    pub fn add(&self, report: ExecutionReport) {
        self.inner.lock().push(report);
    }

    /// Current size. A heuristic flush trigger only, not a hard bound.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Atomically removes and returns everything currently buffered.
    pub fn drain_all(&self) -> Vec<ExecutionReport> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Re-inserts a drained snapshot after a failed persist, so the batch
    /// joins the next drain instead of being lost.
    pub fn restore(&self, batch: Vec<ExecutionReport>) {
        self.inner.lock().extend(batch);
    }
}
