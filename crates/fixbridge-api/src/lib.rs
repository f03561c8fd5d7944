//! Subscriber-facing surface of the fixbridge pipeline.
//!
//! - [`Hub`]: broadcast channel plus per-client group channels over which
//!   report notices fan out to WebSocket subscribers
//! - [`NotificationScheduler`]: polls the report store for unnotified rows
//!   and emits each one through the hub exactly once
//! - [`server`]: axum routes for HTTP order intake, WebSocket subscriptions
//!   and Prometheus exposition
//! - [`identity`]: bearer-token client-identity extraction

pub mod config;
pub mod error;
pub mod hub;
pub mod identity;
pub mod monitor;
pub mod notice;
pub mod server;

pub use config::{ApiConfig, NotifyConfig};
pub use error::{ApiError, ApiResult};
pub use hub::{Fanout, GroupSubscription, Hub};
pub use monitor::NotificationScheduler;
pub use notice::ReportNotice;
pub use server::{create_router, run_server, ApiState};
