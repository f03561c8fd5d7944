//! Outbound venue messages.
//!
//! Each order kind produces a differently-shaped payload: a new order carries
//! the full order body, a replace carries the body plus linkage to the order
//! being amended, a cancel carries linkage only. The shapes are variants of
//! one tagged enum with a single dispatch switch in [`OutboundMessage::for_order`].

use chrono::{DateTime, Utc};
use fixbridge_core::{ClientOrderId, Order, OrderKind, OrderType, Side, TimeInForce};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One venue-bound message, shaped by its order kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    NewOrder {
        client_order_id: ClientOrderId,
        symbol: String,
        side: Option<Side>,
        quantity: Decimal,
        price: Decimal,
        order_type: Option<OrderType>,
        time_in_force: Option<TimeInForce>,
        account: String,
        currency: String,
        security_id: String,
        destination: String,
        transact_time: DateTime<Utc>,
    },
    ReplaceOrder {
        client_order_id: ClientOrderId,
        orig_client_order_id: Option<ClientOrderId>,
        venue_order_id: Option<String>,
        symbol: String,
        side: Option<Side>,
        quantity: Decimal,
        price: Decimal,
        order_type: Option<OrderType>,
        time_in_force: Option<TimeInForce>,
        security_id: String,
        destination: String,
        transact_time: DateTime<Utc>,
    },
    CancelOrder {
        client_order_id: ClientOrderId,
        orig_client_order_id: Option<ClientOrderId>,
        venue_order_id: Option<String>,
        symbol: String,
        market_id: Option<String>,
        market_segment_id: Option<String>,
        transact_time: DateTime<Utc>,
    },
}

impl OutboundMessage {
    /// Builds the kind-shaped message for one order row.
    ///
    /// Rows are validated at intake; fields a kind does not use keep their
    /// neutral values and are simply carried as-is.
    pub fn for_order(order: &Order) -> Self {
        let transact_time = Utc::now();
        match order.kind {
            OrderKind::New => Self::NewOrder {
                client_order_id: order.client_order_id.clone(),
                symbol: order.symbol.clone(),
                side: order.side,
                quantity: order.quantity,
                price: order.price,
                order_type: order.order_type,
                time_in_force: order.time_in_force,
                account: order.account.clone(),
                currency: order.currency.clone(),
                security_id: order.security_id.clone(),
                destination: order.destination.clone(),
                transact_time,
            },
            OrderKind::Replace => Self::ReplaceOrder {
                client_order_id: order.client_order_id.clone(),
                orig_client_order_id: order.orig_client_order_id.clone(),
                venue_order_id: order.venue_order_id.clone(),
                symbol: order.symbol.clone(),
                side: order.side,
                quantity: order.quantity,
                price: order.price,
                order_type: order.order_type,
                time_in_force: order.time_in_force,
                security_id: order.security_id.clone(),
                destination: order.destination.clone(),
                transact_time,
            },
            OrderKind::Cancel => Self::CancelOrder {
                client_order_id: order.client_order_id.clone(),
                orig_client_order_id: order.orig_client_order_id.clone(),
                venue_order_id: order.venue_order_id.clone(),
                symbol: order.symbol.clone(),
                market_id: order.market_id.clone(),
                market_segment_id: order.market_segment_id.clone(),
                transact_time,
            },
        }
    }

    /// The order kind this message was built from.
    #[must_use]
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::NewOrder { .. } => OrderKind::New,
            Self::ReplaceOrder { .. } => OrderKind::Replace,
            Self::CancelOrder { .. } => OrderKind::Cancel,
        }
    }

    /// The client order id carried on the message.
    #[must_use]
    pub fn client_order_id(&self) -> &ClientOrderId {
        match self {
            Self::NewOrder {
                client_order_id, ..
            }
            | Self::ReplaceOrder {
                client_order_id, ..
            }
            | Self::CancelOrder {
                client_order_id, ..
            } => client_order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixbridge_core::ClientId;
    use rust_decimal_macros::dec;

    fn sample_order(kind: OrderKind) -> Order {
        Order {
            id: 1,
            client_order_id: ClientOrderId::from("ord-1"),
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
            security_id: "SEC-1".to_string(),
            destination: "XVEN".to_string(),
            orig_client_order_id: Some(ClientOrderId::from("ord-0")),
            venue_order_id: Some("V-1".to_string()),
            market_id: Some("XMKT".to_string()),
            market_segment_id: Some("SEG".to_string()),
            pending: true,
            created_at: Utc::now(),
            dispatched_at: None,
        }
    }

    #[test]
    fn test_new_order_message_carries_full_body() {
        let message = OutboundMessage::for_order(&sample_order(OrderKind::New));
        assert_eq!(message.kind(), OrderKind::New);
        assert_eq!(message.client_order_id().as_str(), "ord-1");
        match message {
            OutboundMessage::NewOrder {
                symbol,
                quantity,
                price,
                account,
                ..
            } => {
                assert_eq!(symbol, "EURUSD");
                assert_eq!(quantity, dec!(100));
                assert_eq!(price, dec!(1.0845));
                assert_eq!(account, "ACC-1");
            }
            other => panic!("expected NewOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_replace_message_carries_linkage() {
        let message = OutboundMessage::for_order(&sample_order(OrderKind::Replace));
        match message {
            OutboundMessage::ReplaceOrder {
                orig_client_order_id,
                venue_order_id,
                quantity,
                ..
            } => {
                assert_eq!(orig_client_order_id.unwrap().as_str(), "ord-0");
                assert_eq!(venue_order_id.as_deref(), Some("V-1"));
                assert_eq!(quantity, dec!(100));
            }
            other => panic!("expected ReplaceOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_message_carries_linkage_only() {
        let message = OutboundMessage::for_order(&sample_order(OrderKind::Cancel));
        assert_eq!(message.kind(), OrderKind::Cancel);
        match message {
            OutboundMessage::CancelOrder {
                venue_order_id,
                market_id,
                market_segment_id,
                ..
            } => {
                assert_eq!(venue_order_id.as_deref(), Some("V-1"));
                assert_eq!(market_id.as_deref(), Some("XMKT"));
                assert_eq!(market_segment_id.as_deref(), Some("SEG"));
            }
            other => panic!("expected CancelOrder, got {other:?}"),
        }
    }

    #[test]
    fn test_message_serde_tag() {
        let message = OutboundMessage::for_order(&sample_order(OrderKind::Cancel));
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"type\":\"cancel_order\""));
    }
}
