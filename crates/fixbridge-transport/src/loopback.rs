//! Simulated venue for end-to-end runs.
//!
//! Acknowledges every accepted message with a synthesized execution report
//! pushed into the inbound channel after a configurable delay: new orders are
//! acknowledged, replaces come back replaced, cancels come back canceled.
//! Quantities and prices echo the outbound message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fixbridge_core::{ExecType, InboundReport, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::outbound::OutboundMessage;
use crate::session::SessionGate;
use crate::transport::{SendOutcome, Transport};
use crate::BoxFuture;

/// Loopback venue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackConfig {
    /// Delay before the synthesized report is delivered, in milliseconds.
    #[serde(default = "default_ack_delay_ms")]
    pub ack_delay_ms: u64,
}

fn default_ack_delay_ms() -> u64 {
    25
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            ack_delay_ms: default_ack_delay_ms(),
        }
    }
}

/// In-process venue: every send is acknowledged with an execution report.
///
/// The simulated session is established at construction, so the gate is
/// marked up immediately.
pub struct LoopbackTransport {
    config: LoopbackConfig,
    inbound: mpsc::UnboundedSender<InboundReport>,
    session: Arc<SessionGate>,
    next_seq: AtomicU64,
}

impl LoopbackTransport {
    pub fn new(
        config: LoopbackConfig,
        inbound: mpsc::UnboundedSender<InboundReport>,
        session: Arc<SessionGate>,
    ) -> Self {
        session.mark_up();
        Self {
            config,
            inbound,
            session,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Builds the venue's response to one outbound message.
    fn acknowledge(&self, message: &OutboundMessage) -> InboundReport {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let exec_id = Some(format!("E-{seq}"));
        let transact_time = Some(Utc::now());

        match message {
            OutboundMessage::NewOrder {
                client_order_id,
                symbol,
                side,
                quantity,
                price,
                time_in_force,
                account,
                ..
            } => InboundReport {
                exec_id,
                client_order_id: Some(client_order_id.to_string()),
                venue_order_id: Some(format!("V-{seq}")),
                exec_type: Some(ExecType::New),
                order_status: Some(OrderStatus::New),
                symbol: Some(symbol.clone()),
                side: *side,
                leaves_qty: Some(*quantity),
                cum_qty: Some(Decimal::ZERO),
                avg_price: Some(Decimal::ZERO),
                order_qty: Some(*quantity),
                price: Some(*price),
                time_in_force: *time_in_force,
                account: Some(account.clone()),
                transact_time,
            },
            OutboundMessage::ReplaceOrder {
                client_order_id,
                venue_order_id,
                symbol,
                side,
                quantity,
                price,
                time_in_force,
                ..
            } => InboundReport {
                exec_id,
                client_order_id: Some(client_order_id.to_string()),
                venue_order_id: Some(
                    venue_order_id
                        .clone()
                        .unwrap_or_else(|| format!("V-{seq}")),
                ),
                exec_type: Some(ExecType::Replaced),
                order_status: Some(OrderStatus::Replaced),
                symbol: Some(symbol.clone()),
                side: *side,
                leaves_qty: Some(*quantity),
                cum_qty: Some(Decimal::ZERO),
                avg_price: Some(Decimal::ZERO),
                order_qty: Some(*quantity),
                price: Some(*price),
                time_in_force: *time_in_force,
                account: None,
                transact_time,
            },
            OutboundMessage::CancelOrder {
                client_order_id,
                venue_order_id,
                symbol,
                ..
            } => InboundReport {
                exec_id,
                client_order_id: Some(client_order_id.to_string()),
                venue_order_id: Some(
                    venue_order_id
                        .clone()
                        .unwrap_or_else(|| format!("V-{seq}")),
                ),
                exec_type: Some(ExecType::Canceled),
                order_status: Some(OrderStatus::Canceled),
                symbol: Some(symbol.clone()),
                side: None,
                leaves_qty: Some(Decimal::ZERO),
                cum_qty: Some(Decimal::ZERO),
                avg_price: Some(Decimal::ZERO),
                order_qty: None,
                price: None,
                time_in_force: None,
                account: None,
                transact_time,
            },
        }
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, message: OutboundMessage) -> BoxFuture<'_, SendOutcome> {
        Box::pin(async move {
            if !self.session.is_up() {
                return SendOutcome::SessionUnavailable;
            }

            let report = self.acknowledge(&message);
            debug!(
                client_order_id = %message.client_order_id(),
                kind = %message.kind(),
                "Loopback venue accepted message"
            );

            let delay = Duration::from_millis(self.config.ack_delay_ms);
            let inbound = self.inbound.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // Receiver gone only during shutdown; nothing left to deliver to.
                let _ = inbound.send(report);
            });

            SendOutcome::Sent
        })
    }
}
