//! Core domain types for the fixbridge order pipeline.
//!
//! This crate provides the vocabulary shared by every stage of the pipeline:
//! - `ClientOrderId`, `ClientId`: caller-facing identifiers
//! - `Order`, `OrderKind`: the durable order-intent row and its request kind
//! - `InboundReport`, `ExecutionReport`: venue execution reports before and
//!   after normalization/attribution
//! - `Side`, `OrderType`, `TimeInForce`, `ExecType`, `OrderStatus`: trading enums

pub mod error;
pub mod ids;
pub mod order;
pub mod report;

pub use error::{CoreError, Result};
pub use ids::{ClientId, ClientOrderId};
pub use order::{Order, OrderKind, OrderType, Side, TimeInForce};
pub use report::{ExecType, ExecutionReport, InboundReport, OrderStatus};
