//! The ingest task: inbound channel to intake buffer.
//!
//! The transport pushes decoded reports into an unbounded channel; this
//! task receives them, normalizes missing fields to neutral values, resolves
//! the originating client, and buffers the result. Running attribution here
//! rather than inside the transport callback keeps a slow store lookup off
//! the transport's inbound path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fixbridge_core::{ExecutionReport, InboundReport};
use fixbridge_store::{DynOrderStore, OrderStore};
use fixbridge_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::ReportBuffer;

/// Receives inbound reports until cancellation. On shutdown, whatever is
/// already queued in the channel is ingested before exit.
pub async fn run_ingest(
    mut inbound: mpsc::UnboundedReceiver<InboundReport>,
    orders: DynOrderStore,
    buffer: Arc<ReportBuffer>,
    op_timeout: Duration,
    shutdown: CancellationToken,
) {
    info!("Report ingest started");

    loop {
        tokio::select! {
            maybe = inbound.recv() => {
                match maybe {
                    Some(report) => ingest_one(report, &orders, &buffer, op_timeout).await,
                    None => {
                        debug!("Inbound channel closed");
                        break;
                    }
                }
            }
            () = shutdown.cancelled() => {
                let mut drained = 0usize;
                while let Ok(report) = inbound.try_recv() {
                    ingest_one(report, &orders, &buffer, op_timeout).await;
                    drained += 1;
                }
                if drained > 0 {
                    info!(count = drained, "Ingested queued reports before shutdown");
                }
                break;
            }
        }
    }

    info!("Report ingest stopped");
}

/// Normalizes one inbound payload and attributes it to the originating
/// client. An attribution miss, lookup failure or timeout never drops the
/// report; it proceeds unattributed.
async fn ingest_one(
    inbound: InboundReport,
    orders: &DynOrderStore,
    buffer: &Arc<ReportBuffer>,
    op_timeout: Duration,
) {
    let mut report = ExecutionReport::from_inbound(inbound, Utc::now());

    if !report.client_order_id.is_empty() {
        match timeout(op_timeout, orders.find_by_client_order_id(&report.client_order_id)).await
        {
            Ok(Ok(Some(order))) => report.client = Some(order.client),
            Ok(Ok(None)) => {
                debug!(
                    client_order_id = %report.client_order_id,
                    exec_id = %report.exec_id,
                    "No originating order, report stays unattributed"
                );
            }
            Ok(Err(e)) => {
                warn!(
                    client_order_id = %report.client_order_id,
                    error = %e,
                    "Attribution lookup failed, report stays unattributed"
                );
            }
            Err(_) => {
                warn!(
                    client_order_id = %report.client_order_id,
                    "Attribution lookup timed out, report stays unattributed"
                );
            }
        }
    }

    buffer.add(report);
    Metrics::report_buffered(buffer.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixbridge_core::{ClientId, ClientOrderId, Order, OrderKind, OrderType, Side, TimeInForce};
    use fixbridge_store::{MemoryOrderStore, OrderStore};
    use rust_decimal_macros::dec;

    fn sample_order(client_order_id: &str, client: &str) -> Order {
        Order {
            id: 0,
            client_order_id: ClientOrderId::from(client_order_id),
            kind: OrderKind::New,
            client: ClientId::from(client),
            symbol: "EURUSD".to_string(),
            side: Some(Side::Buy),
            quantity: dec!(100),
            price: dec!(1.0845),
            order_type: Some(OrderType::Limit),
            time_in_force: Some(TimeInForce::Day),
            account: "ACC-1".to_string(),
            currency: "USD".to_string(),
            security_id: String::new(),
            destination: String::new(),
            orig_client_order_id: None,
            venue_order_id: None,
            market_id: None,
            market_segment_id: None,
            pending: true,
            created_at: Utc::now(),
            dispatched_at: None,
        }
    }

    fn inbound_for(client_order_id: Option<&str>) -> InboundReport {
        InboundReport {
            exec_id: Some("E-1".to_string()),
            client_order_id: client_order_id.map(str::to_string),
            ..InboundReport::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_attributes_known_order() {
        let orders = Arc::new(MemoryOrderStore::new());
        orders.insert(sample_order("ord-1", "acme")).await.unwrap();
        let orders: DynOrderStore = orders;
        let buffer = Arc::new(ReportBuffer::new());

        ingest_one(
            inbound_for(Some("ord-1")),
            &orders,
            &buffer,
            Duration::from_secs(1),
        )
        .await;

        let drained = buffer.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].client, Some(ClientId::from("acme")));
    }

    #[tokio::test]
    async fn test_ingest_keeps_unmatched_report() {
        let orders: DynOrderStore = Arc::new(MemoryOrderStore::new());
        let buffer = Arc::new(ReportBuffer::new());

        ingest_one(
            inbound_for(Some("nobody")),
            &orders,
            &buffer,
            Duration::from_secs(1),
        )
        .await;

        let drained = buffer.drain_all();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].client.is_none(), "miss must not drop the report");
    }

    #[tokio::test]
    async fn test_ingest_skips_lookup_without_client_order_id() {
        let orders: DynOrderStore = Arc::new(MemoryOrderStore::new());
        let buffer = Arc::new(ReportBuffer::new());

        ingest_one(inbound_for(None), &orders, &buffer, Duration::from_secs(1)).await;

        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn test_run_ingest_drains_queue_on_shutdown() {
        let orders: DynOrderStore = Arc::new(MemoryOrderStore::new());
        let buffer = Arc::new(ReportBuffer::new());
        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(inbound_for(Some("a"))).unwrap();
        tx.send(inbound_for(Some("b"))).unwrap();
        shutdown.cancel();

        run_ingest(
            rx,
            orders,
            buffer.clone(),
            Duration::from_secs(1),
            shutdown,
        )
        .await;

        assert_eq!(buffer.len(), 2, "queued reports ingested before exit");
    }

    #[tokio::test]
    async fn test_run_ingest_exits_when_channel_closes() {
        let orders: DynOrderStore = Arc::new(MemoryOrderStore::new());
        let buffer = Arc::new(ReportBuffer::new());
        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(inbound_for(Some("a"))).unwrap();
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(1),
            run_ingest(rx, orders, buffer.clone(), Duration::from_secs(1), shutdown),
        )
        .await
        .expect("ingest should exit on channel close");

        assert_eq!(buffer.len(), 1);
    }
}
