//! The dispatch scheduler loop.

use std::sync::Arc;

use fixbridge_core::{Order, OrderKind};
use fixbridge_store::{DynOrderStore, OrderStore};
use fixbridge_telemetry::Metrics;
use fixbridge_transport::{DynTransport, OutboundMessage, SendOutcome, SessionGate, Transport};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DispatchConfig, DispatchPolicy};
use crate::error::DispatchError;

/// Polls the order store for pending rows and hands them to the transport.
///
/// Exactly one instance runs per venue session. `run` consumes the
/// scheduler, so the loop cannot be entered twice.
pub struct DispatchScheduler {
    config: DispatchConfig,
    orders: DynOrderStore,
    transport: DynTransport,
    session: Arc<SessionGate>,
    shutdown: CancellationToken,
}

impl DispatchScheduler {
    pub fn new(
        config: DispatchConfig,
        orders: DynOrderStore,
        transport: DynTransport,
        session: Arc<SessionGate>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            orders,
            transport,
            session,
            shutdown,
        }
    }

    /// Runs until cancellation. Self-pacing: sleeps the idle delay only
    /// when a full cycle over all three kinds found nothing, and pauses
    /// entirely while the session gate is down.
    pub async fn run(self) {
        info!(
            batch_size = self.config.batch_size,
            idle_delay_ms = self.config.idle_delay_ms,
            policy = ?self.config.policy,
            "Dispatch scheduler started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            if !self.session.is_up() {
                Metrics::session_state(false);
                tokio::select! {
                    () = self.session.wait_until_up() => {
                        Metrics::session_state(true);
                        info!("Session gate reopened, resuming dispatch");
                        continue;
                    }
                    () = self.shutdown.cancelled() => break,
                }
            }

            let found_work = self.run_cycle().await;

            if !found_work {
                tokio::select! {
                    () = tokio::time::sleep(self.config.idle_delay()) => {}
                    () = self.shutdown.cancelled() => break,
                }
            }
        }

        info!("Dispatch scheduler stopped");
    }

    /// One polling cycle: fetch and dispatch up to `batch_size` rows per
    /// kind, new then replace then cancel. Returns false only when all
    /// three fetches came back empty, which is the idle-delay condition.
    async fn run_cycle(&self) -> bool {
        let mut found_work = false;

        for kind in OrderKind::ALL {
            let batch = match timeout(
                self.config.op_timeout(),
                self.orders.fetch_pending(kind, self.config.batch_size),
            )
            .await
            {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    warn!(%kind, error = %e, "Pending-order fetch failed, retrying next cycle");
                    continue;
                }
                Err(_) => {
                    warn!(%kind, "Pending-order fetch timed out, retrying next cycle");
                    continue;
                }
            };

            if batch.is_empty() {
                continue;
            }
            found_work = true;

            for order in batch {
                if self.shutdown.is_cancelled() {
                    // Unsent rows stay pending for the next instance.
                    return found_work;
                }
                if let Err(e) = self.dispatch_one(&order).await {
                    Metrics::dispatch_send_failure(&kind.to_string());
                    if e.is_session_loss() {
                        self.session.mark_down();
                        Metrics::session_state(false);
                        match self.config.policy {
                            DispatchPolicy::RequeueOnSessionLoss => {
                                warn!(
                                    order_id = order.id,
                                    client_order_id = %order.client_order_id,
                                    error = %e,
                                    "Send failed, row stays pending until the session returns"
                                );
                                return found_work;
                            }
                            DispatchPolicy::FireAndForget => {
                                warn!(
                                    order_id = order.id,
                                    client_order_id = %order.client_order_id,
                                    error = %e,
                                    "Send failed, marking dispatched anyway (fire-and-forget)"
                                );
                                self.mark_dispatched(&order).await;
                            }
                        }
                    } else {
                        warn!(order_id = order.id, error = %e, "Dispatch failed for one row");
                    }
                }
            }
        }

        found_work
    }

    /// Builds the outbound message for one row, sends it, and flips the
    /// pending flag on success.
    async fn dispatch_one(&self, order: &Order) -> Result<(), DispatchError> {
        let message = OutboundMessage::for_order(order);

        let outcome = match timeout(self.config.op_timeout(), self.transport.send(message)).await
        {
            Ok(outcome) => outcome,
            Err(_) => return Err(DispatchError::Timeout("transport send")),
        };

        match outcome {
            SendOutcome::Sent => {
                debug!(
                    order_id = order.id,
                    client_order_id = %order.client_order_id,
                    kind = %order.kind,
                    "Order handed to transport"
                );
                Metrics::order_dispatched(&order.kind.to_string());
                self.mark_dispatched(order).await;
                Ok(())
            }
            SendOutcome::SessionUnavailable => Err(DispatchError::SessionUnavailable),
            SendOutcome::Failed(reason) => Err(DispatchError::SendFailed(reason)),
        }
    }

    /// Flips the pending flag. A store failure here is logged and the row
    /// will be re-fetched and re-sent next cycle (at-least-once in this
    /// failure mode).
    async fn mark_dispatched(&self, order: &Order) {
        match timeout(self.config.op_timeout(), self.orders.mark_dispatched(order.id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(order_id = order.id, error = %e, "Failed to mark order dispatched");
            }
            Err(_) => {
                warn!(order_id = order.id, "Mark-dispatched timed out");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use fixbridge_core::{ClientId, ClientOrderId, OrderType, Side, TimeInForce};
    use fixbridge_store::{MemoryOrderStore, OrderStore};
    use fixbridge_transport::MockTransport;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn sample_order(client_order_id: &str, kind: OrderKind, age_secs: i64) -> Order {
        Order {
            id: 0,
            client_order_id: ClientOrderId::from(client_order_id),
            kind,
            client: ClientId::from("acme"),
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
            orig_client_order_id: Some(ClientOrderId::from("ord-0")),
            venue_order_id: Some("V-1".to_string()),
            market_id: None,
            market_segment_id: None,
            pending: true,
            created_at: Utc::now() - ChronoDuration::seconds(age_secs),
            dispatched_at: None,
        }
    }

    struct Fixture {
        orders: Arc<MemoryOrderStore>,
        transport: Arc<MockTransport>,
        session: Arc<SessionGate>,
        shutdown: CancellationToken,
    }

    impl Fixture {
        fn new(config: DispatchConfig) -> (Self, DispatchScheduler) {
            let orders = Arc::new(MemoryOrderStore::new());
            let transport = Arc::new(MockTransport::new());
            let session = Arc::new(SessionGate::new());
            session.mark_up();
            let shutdown = CancellationToken::new();

            let scheduler = DispatchScheduler::new(
                config,
                orders.clone(),
                transport.clone(),
                session.clone(),
                shutdown.clone(),
            );
            (
                Self {
                    orders,
                    transport,
                    session,
                    shutdown,
                },
                scheduler,
            )
        }
    }

    #[tokio::test]
    async fn test_cycle_dispatches_oldest_first_up_to_batch_size() {
        let config = DispatchConfig {
            batch_size: 2,
            ..DispatchConfig::default()
        };
        let (fx, scheduler) = Fixture::new(config);

        fx.orders.insert(sample_order("n1", OrderKind::New, 30)).await.unwrap();
        fx.orders.insert(sample_order("n2", OrderKind::New, 20)).await.unwrap();
        fx.orders.insert(sample_order("n3", OrderKind::New, 10)).await.unwrap();

        assert!(scheduler.run_cycle().await);

        let sent = fx.transport.sent_messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].client_order_id().as_str(), "n1");
        assert_eq!(sent[1].client_order_id().as_str(), "n2");

        let remaining = fx.orders.fetch_pending(OrderKind::New, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].client_order_id.as_str(), "n3");
    }

    #[tokio::test]
    async fn test_dispatched_rows_are_never_refetched() {
        let (fx, scheduler) = Fixture::new(DispatchConfig::default());
        fx.orders.insert(sample_order("n1", OrderKind::New, 10)).await.unwrap();

        assert!(scheduler.run_cycle().await);
        // Second cycle finds nothing: the row is out of every future fetch.
        assert!(!scheduler.run_cycle().await);
        assert_eq!(fx.transport.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_covers_all_three_kinds() {
        let (fx, scheduler) = Fixture::new(DispatchConfig::default());
        fx.orders.insert(sample_order("n1", OrderKind::New, 30)).await.unwrap();
        fx.orders.insert(sample_order("r1", OrderKind::Replace, 20)).await.unwrap();
        fx.orders.insert(sample_order("c1", OrderKind::Cancel, 10)).await.unwrap();

        assert!(scheduler.run_cycle().await);

        let kinds: Vec<OrderKind> = fx
            .transport
            .sent_messages()
            .iter()
            .map(|m| m.kind())
            .collect();
        assert_eq!(kinds, vec![OrderKind::New, OrderKind::Replace, OrderKind::Cancel]);
    }

    #[tokio::test]
    async fn test_idle_only_when_every_kind_is_empty() {
        let (fx, scheduler) = Fixture::new(DispatchConfig::default());
        // Work on only one of the three kinds must still suppress the idle delay.
        fx.orders.insert(sample_order("c1", OrderKind::Cancel, 10)).await.unwrap();

        assert!(scheduler.run_cycle().await);
        assert!(!scheduler.run_cycle().await);
    }

    #[tokio::test]
    async fn test_requeue_policy_leaves_row_pending_on_session_loss() {
        let (fx, scheduler) = Fixture::new(DispatchConfig::default());
        fx.orders.insert(sample_order("n1", OrderKind::New, 10)).await.unwrap();
        fx.transport.set_next_outcome(SendOutcome::SessionUnavailable);

        scheduler.run_cycle().await;

        assert!(!fx.session.is_up());
        let pending = fx.orders.fetch_pending(OrderKind::New, 10).await.unwrap();
        assert_eq!(pending.len(), 1, "row must stay pending for retry");
    }

    #[tokio::test]
    async fn test_requeue_policy_stops_batch_after_session_loss() {
        let (fx, scheduler) = Fixture::new(DispatchConfig::default());
        fx.orders.insert(sample_order("n1", OrderKind::New, 20)).await.unwrap();
        fx.orders.insert(sample_order("n2", OrderKind::New, 10)).await.unwrap();
        fx.transport.set_next_outcome(SendOutcome::Failed("conn reset".to_string()));

        scheduler.run_cycle().await;

        // Only the first row was attempted; the second waits for reconnect.
        assert_eq!(fx.transport.sent_messages().len(), 1);
        let pending = fx.orders.fetch_pending(OrderKind::New, 10).await.unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn test_fire_and_forget_marks_dispatched_despite_failure() {
        let config = DispatchConfig {
            policy: DispatchPolicy::FireAndForget,
            ..DispatchConfig::default()
        };
        let (fx, scheduler) = Fixture::new(config);
        fx.orders.insert(sample_order("n1", OrderKind::New, 10)).await.unwrap();
        fx.transport.set_next_outcome(SendOutcome::SessionUnavailable);

        scheduler.run_cycle().await;

        assert!(!fx.session.is_up());
        let pending = fx.orders.fetch_pending(OrderKind::New, 10).await.unwrap();
        assert!(pending.is_empty(), "legacy behavior never retries");
    }

    #[tokio::test]
    async fn test_run_pauses_while_gate_is_down() {
        let (fx, scheduler) = Fixture::new(DispatchConfig {
            idle_delay_ms: 10,
            ..DispatchConfig::default()
        });
        fx.session.mark_down();
        fx.orders.insert(sample_order("n1", OrderKind::New, 10)).await.unwrap();

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fx.transport.sent_messages().is_empty(), "gate down, nothing sent");

        fx.session.mark_up();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.transport.sent_messages().len(), 1);

        fx.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_exits_on_cancellation() {
        let (fx, scheduler) = Fixture::new(DispatchConfig {
            idle_delay_ms: 5,
            ..DispatchConfig::default()
        });
        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(20)).await;

        fx.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop within one polling delay")
            .unwrap();
    }
}
