//! Typed notices pushed to subscribers.

use chrono::{DateTime, Utc};
use fixbridge_core::{ExecType, ExecutionReport, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Report fields carried on both notice scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBody {
    pub report_id: i64,
    pub exec_id: String,
    pub client_order_id: String,
    pub venue_order_id: String,
    pub exec_type: ExecType,
    pub order_status: OrderStatus,
    pub symbol: String,
    pub leaves_qty: Decimal,
    pub cum_qty: Decimal,
    pub avg_price: Decimal,
    pub transact_time: Option<DateTime<Utc>>,
}

impl ReportBody {
    fn from_report(report: &ExecutionReport) -> Self {
        Self {
            report_id: report.id,
            exec_id: report.exec_id.clone(),
            client_order_id: report.client_order_id.to_string(),
            venue_order_id: report.venue_order_id.clone(),
            exec_type: report.exec_type,
            order_status: report.order_status,
            symbol: report.symbol.clone(),
            leaves_qty: report.leaves_qty,
            cum_qty: report.cum_qty,
            avg_price: report.avg_price,
            transact_time: report.transact_time,
        }
    }
}

/// One JSON message on a subscriber's WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportNotice {
    /// Subscription acknowledgment, sent once on connect before any report.
    Subscribed { group: String },
    /// A report notice delivered to every subscriber.
    ReportBroadcast {
        #[serde(flatten)]
        body: ReportBody,
    },
    /// A report notice delivered only to the attributed client's group.
    ReportTargeted {
        client: String,
        #[serde(flatten)]
        body: ReportBody,
    },
}

impl ReportNotice {
    pub fn subscribed(group: &str) -> Self {
        Self::Subscribed {
            group: group.to_string(),
        }
    }

    pub fn broadcast(report: &ExecutionReport) -> Self {
        Self::ReportBroadcast {
            body: ReportBody::from_report(report),
        }
    }

    pub fn targeted(report: &ExecutionReport) -> Self {
        Self::ReportTargeted {
            client: report
                .client
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            body: ReportBody::from_report(report),
        }
    }
}
