//! Execution reports, before and after normalization.
//!
//! The transport delivers an [`InboundReport`]: a decoded execution-report
//! payload in which any field the venue omitted is `None`. Ingest turns it
//! into an [`ExecutionReport`] row, defaulting missing fields to neutral
//! values (empty string, zero, `Unknown`) rather than rejecting the item,
//! and attaching the client identity when the originating order is found.

use crate::ids::{ClientId, ClientOrderId};
use crate::order::{Side, TimeInForce};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution type reported by the venue for one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecType {
    New,
    PartialFill,
    Fill,
    Canceled,
    Replaced,
    Rejected,
    Expired,
    #[default]
    Unknown,
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::PartialFill => "partial_fill",
            Self::Fill => "fill",
            Self::Canceled => "canceled",
            Self::Replaced => "replaced",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Current order status carried on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Replaced,
    Rejected,
    #[default]
    Unknown,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::Canceled => "canceled",
            Self::Replaced => "replaced",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// One decoded execution report as delivered by the transport, before
/// normalization and attribution. Fields the venue did not set are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundReport {
    pub exec_id: Option<String>,
    pub client_order_id: Option<String>,
    pub venue_order_id: Option<String>,
    pub exec_type: Option<ExecType>,
    pub order_status: Option<OrderStatus>,
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub leaves_qty: Option<Decimal>,
    pub cum_qty: Option<Decimal>,
    pub avg_price: Option<Decimal>,
    pub order_qty: Option<Decimal>,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub account: Option<String>,
    pub transact_time: Option<DateTime<Utc>>,
}

/// One durable row per inbound venue message.
///
/// Created at ingest, persisted in batches by the flush scheduler, and
/// mutated only by the notification scheduler (the `notified` flip). Rows
/// are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Store-assigned sequence id (0 until persisted).
    pub id: i64,
    /// Venue execution id, empty if the venue omitted it.
    pub exec_id: String,
    /// Linked client order id, possibly empty; attribution falls back to
    /// unresolved when it is.
    pub client_order_id: ClientOrderId,
    pub venue_order_id: String,
    pub exec_type: ExecType,
    pub order_status: OrderStatus,
    pub symbol: String,
    pub side: Option<Side>,
    pub leaves_qty: Decimal,
    pub cum_qty: Decimal,
    pub avg_price: Decimal,
    pub order_qty: Decimal,
    pub price: Decimal,
    pub time_in_force: Option<TimeInForce>,
    pub account: String,
    pub transact_time: Option<DateTime<Utc>>,
    /// Client identity resolved from the originating order at receipt time;
    /// `None` when the lookup found nothing.
    pub client: Option<ClientId>,
    /// False until the notification scheduler has fanned this row out.
    pub notified: bool,
    pub created_at: DateTime<Utc>,
    pub last_update_at: Option<DateTime<Utc>>,
}

impl ExecutionReport {
    /// Normalizes a decoded inbound payload into a persistable row.
    ///
    /// Missing fields become neutral values; nothing about the payload can
    /// fail the conversion. Attribution (`client`) is left unresolved here
    /// and filled in by ingest when the originating order is found.
    pub fn from_inbound(inbound: InboundReport, received_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            exec_id: inbound.exec_id.unwrap_or_default(),
            client_order_id: ClientOrderId::from_string(
                inbound.client_order_id.unwrap_or_default(),
            ),
            venue_order_id: inbound.venue_order_id.unwrap_or_default(),
            exec_type: inbound.exec_type.unwrap_or_default(),
            order_status: inbound.order_status.unwrap_or_default(),
            symbol: inbound.symbol.unwrap_or_default(),
            side: inbound.side,
            leaves_qty: inbound.leaves_qty.unwrap_or_default(),
            cum_qty: inbound.cum_qty.unwrap_or_default(),
            avg_price: inbound.avg_price.unwrap_or_default(),
            order_qty: inbound.order_qty.unwrap_or_default(),
            price: inbound.price.unwrap_or_default(),
            time_in_force: inbound.time_in_force,
            account: inbound.account.unwrap_or_default(),
            transact_time: inbound.transact_time,
            client: None,
            notified: false,
            created_at: received_at,
            last_update_at: None,
        }
    }

    /// True when the originating client was resolved at ingest.
    pub fn is_attributed(&self) -> bool {
        self.client.is_some()
    }
}
