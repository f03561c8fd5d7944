//! Order mailbox contract.

use std::sync::Arc;

use fixbridge_core::{ClientOrderId, Order, OrderKind};

use crate::error::StoreResult;
use crate::BoxFuture;

/// Durable mailbox of order rows.
///
/// Read-then-update sequences (`fetch_pending` then `mark_dispatched`) are
/// not atomic; the pipeline assumes exactly one dispatch scheduler instance
/// per store partition. A multi-replica deployment must add a claim step
/// before dispatching.
pub trait OrderStore: Send + Sync {
    /// Inserts a validated order row and returns it with its assigned id.
    fn insert(&self, order: Order) -> BoxFuture<'_, StoreResult<Order>>;

    /// Fetches up to `limit` pending rows of one kind, oldest first.
    fn fetch_pending(
        &self,
        kind: OrderKind,
        limit: usize,
    ) -> BoxFuture<'_, StoreResult<Vec<Order>>>;

    /// Flips a row's pending flag after a dispatch attempt. Once flipped the
    /// row is excluded from every future `fetch_pending` result.
    fn mark_dispatched(&self, id: i64) -> BoxFuture<'_, StoreResult<()>>;

    /// Resolves a client order id to the most recent matching row, if any.
    /// Used for execution-report attribution and replace/cancel linking.
    fn find_by_client_order_id<'a>(
        &'a self,
        client_order_id: &'a ClientOrderId,
    ) -> BoxFuture<'a, StoreResult<Option<Order>>>;
}

/// Arc wrapper for OrderStore trait objects.
pub type DynOrderStore = Arc<dyn OrderStore>;
