//! Order dispatch scheduler for fixbridge.
//!
//! A single long-lived, self-pacing loop per venue session. Each cycle it
//! polls the order store for pending rows of each kind (new, replace,
//! cancel), builds the kind-shaped outbound message for every row, hands it
//! to the transport, and flips the row's pending flag. When all three
//! fetches come back empty the loop sleeps its idle delay; otherwise it
//! loops immediately to drain the backlog.

pub mod config;
pub mod error;
pub mod scheduler;

pub use config::{DispatchConfig, DispatchPolicy};
pub use error::{DispatchError, DispatchResult};
pub use scheduler::DispatchScheduler;
