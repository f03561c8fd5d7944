//! In-memory reference implementations of the store traits.
//!
//! These back the test suites and the single-process reference deployment.
//! Rows live in a `Vec` behind a `parking_lot::RwLock`; ordering guarantees
//! come from sorting on `(created_at, id)` so rows created within the same
//! clock tick still come back in insertion order.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use fixbridge_core::{ClientOrderId, ExecutionReport, Order, OrderKind};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::order_store::OrderStore;
use crate::report_store::ReportStore;
use crate::BoxFuture;

/// In-memory order mailbox.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    next_id: AtomicI64,
    rows: RwLock<Vec<Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Total number of rows, pending or not.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert(&self, mut order: Order) -> BoxFuture<'_, StoreResult<Order>> {
        Box::pin(async move {
            order.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            debug!(
                id = order.id,
                client_order_id = %order.client_order_id,
                kind = %order.kind,
                "Order row inserted"
            );
            self.rows.write().push(order.clone());
            Ok(order)
        })
    }

    fn fetch_pending(
        &self,
        kind: OrderKind,
        limit: usize,
    ) -> BoxFuture<'_, StoreResult<Vec<Order>>> {
        Box::pin(async move {
            let rows = self.rows.read();
            let mut pending: Vec<&Order> = rows
                .iter()
                .filter(|r| r.pending && r.kind == kind)
                .collect();
            pending.sort_by_key(|r| (r.created_at, r.id));
            Ok(pending.into_iter().take(limit).cloned().collect())
        })
    }

    fn mark_dispatched(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut rows = self.rows.write();
            match rows.iter_mut().find(|r| r.id == id) {
                Some(row) => {
                    row.pending = false;
                    row.dispatched_at = Some(Utc::now());
                    Ok(())
                }
                None => Err(StoreError::NotFound(id)),
            }
        })
    }

    fn find_by_client_order_id<'a>(
        &'a self,
        client_order_id: &'a ClientOrderId,
    ) -> BoxFuture<'a, StoreResult<Option<Order>>> {
        Box::pin(async move {
            let rows = self.rows.read();
            Ok(rows
                .iter()
                .filter(|r| &r.client_order_id == client_order_id)
                .max_by_key(|r| (r.created_at, r.id))
                .cloned())
        })
    }
}

/// In-memory execution-report mailbox.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    next_id: AtomicI64,
    rows: RwLock<Vec<ExecutionReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Total number of rows, notified or not.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl ReportStore for MemoryReportStore {
    fn persist_batch(&self, reports: Vec<ExecutionReport>) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            // Single write lock for the whole batch: all-or-nothing.
            let mut rows = self.rows.write();
            debug!(count = reports.len(), "Persisting report batch");
            for mut report in reports {
                report.id = self.next_id.fetch_add(1, Ordering::SeqCst);
                rows.push(report);
            }
            Ok(())
        })
    }

    fn fetch_unnotified(&self, limit: usize) -> BoxFuture<'_, StoreResult<Vec<ExecutionReport>>> {
        Box::pin(async move {
            let rows = self.rows.read();
            let mut unnotified: Vec<&ExecutionReport> =
                rows.iter().filter(|r| !r.notified).collect();
            unnotified.sort_by_key(|r| (r.created_at, r.id));
            Ok(unnotified.into_iter().take(limit).cloned().collect())
        })
    }

    fn mark_notified(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let mut rows = self.rows.write();
            match rows.iter_mut().find(|r| r.id == id) {
                Some(row) => {
                    row.notified = true;
                    row.last_update_at = Some(Utc::now());
                    Ok(())
                }
                None => Err(StoreError::NotFound(id)),
            }
        })
    }
}
