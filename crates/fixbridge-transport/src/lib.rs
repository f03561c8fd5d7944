//! Venue transport boundary for fixbridge.
//!
//! The wire-level session engine (framing, sequence numbers, logon,
//! retransmission) is an external collaborator. This crate defines what the
//! pipeline needs from it:
//! - [`OutboundMessage`]: the kind-shaped payload built from an order row
//! - [`Transport`]: fire-and-forget send with an in-band [`SendOutcome`]
//! - [`SessionGate`]: shared connected/disconnected state with change signals
//! - an inbound channel of decoded [`fixbridge_core::InboundReport`]s, handed
//!   to the implementation at construction
//!
//! [`LoopbackTransport`] is a simulated venue that acknowledges every message
//! with a synthesized execution report, so the whole pipeline runs end to end
//! in one process. [`MockTransport`] records sends for tests.

pub mod loopback;
pub mod outbound;
pub mod session;
pub mod transport;

pub use loopback::{LoopbackConfig, LoopbackTransport};
pub use outbound::OutboundMessage;
pub use session::{SessionGate, SessionState};
pub use transport::{DynTransport, MockTransport, SendOutcome, Transport};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
