//! Order rows and order-related enums.
//!
//! An [`Order`] is one durable row per client order intent. Rows are created
//! by the intake boundary, picked up by the dispatch scheduler, and never
//! deleted; the only mutation after insert is the pending-to-dispatched flip.

use crate::error::{CoreError, Result};
use crate::ids::{ClientId, ClientOrderId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
        }
    }
}

/// Time-in-force for orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    #[default]
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "gtc")]
    GoodTilCancelled,
    #[serde(rename = "ioc")]
    ImmediateOrCancel,
    #[serde(rename = "fok")]
    FillOrKill,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::GoodTilCancelled => write!(f, "gtc"),
            Self::ImmediateOrCancel => write!(f, "ioc"),
            Self::FillOrKill => write!(f, "fok"),
        }
    }
}

/// Request kind of an order row. Immutable once created.
///
/// Each kind has its own pending queue in the order store; the dispatch
/// scheduler polls the three queues round-robin every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    New,
    Replace,
    Cancel,
}

impl OrderKind {
    /// All kinds, in the order the dispatch scheduler polls them.
    pub const ALL: [OrderKind; 3] = [OrderKind::New, OrderKind::Replace, OrderKind::Cancel];
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Replace => write!(f, "replace"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// One durable row per client order intent.
///
/// Payload fields are immutable once created and hold neutral values (empty
/// string, zero, `None`) where the kind does not use them: a cancel needs
/// only its linking ids. `pending` stays true until the dispatch scheduler
/// has attempted a send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned sequence id (0 until inserted).
    pub id: i64,
    pub client_order_id: ClientOrderId,
    pub kind: OrderKind,
    /// Identity of the submitting client, resolved at intake.
    pub client: ClientId,
    pub symbol: String,
    pub side: Option<Side>,
    pub quantity: Decimal,
    pub price: Decimal,
    pub order_type: Option<OrderType>,
    pub time_in_force: Option<TimeInForce>,
    pub account: String,
    pub currency: String,
    pub security_id: String,
    /// Venue execution destination.
    pub destination: String,
    /// Client order id of the order being replaced or cancelled.
    pub orig_client_order_id: Option<ClientOrderId>,
    /// Venue-assigned order id, known once the venue has acknowledged.
    pub venue_order_id: Option<String>,
    pub market_id: Option<String>,
    pub market_segment_id: Option<String>,
    /// True until the dispatch scheduler has attempted to send this row.
    pub pending: bool,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Validates the payload against the row's kind.
    ///
    /// New and Replace require a full order payload; Replace additionally
    /// requires the original client order id; Cancel requires only enough
    /// linkage to identify the order at the venue.
    pub fn validate(&self) -> Result<()> {
        if self.client_order_id.is_empty() {
            return Err(CoreError::MissingField("client_order_id"));
        }

        match self.kind {
            OrderKind::New => self.validate_payload(),
            OrderKind::Replace => {
                match &self.orig_client_order_id {
                    Some(orig) if !orig.is_empty() => {}
                    _ => return Err(CoreError::MissingField("orig_client_order_id")),
                }
                self.validate_payload()
            }
            OrderKind::Cancel => {
                let has_venue_id = self.venue_order_id.as_deref().is_some_and(|v| !v.is_empty());
                let has_orig = self
                    .orig_client_order_id
                    .as_ref()
                    .is_some_and(|o| !o.is_empty());
                if !has_venue_id && !has_orig {
                    return Err(CoreError::MissingField("venue_order_id"));
                }
                Ok(())
            }
        }
    }

    fn validate_payload(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(CoreError::MissingField("symbol"));
        }
        if self.side.is_none() {
            return Err(CoreError::MissingField("side"));
        }
        let order_type = self
            .order_type
            .ok_or(CoreError::MissingField("order_type"))?;
        if self.quantity <= Decimal::ZERO {
            return Err(CoreError::InvalidQuantity(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if order_type == OrderType::Limit && self.price <= Decimal::ZERO {
            return Err(CoreError::InvalidPrice(format!(
                "limit orders require a positive price, got {}",
                self.price
            )));
        }
        Ok(())
    }
}
