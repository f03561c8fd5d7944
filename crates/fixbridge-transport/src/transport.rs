//! The transport send boundary.

use std::sync::Arc;

use crate::outbound::OutboundMessage;
use crate::BoxFuture;

/// Result of a transport send attempt.
///
/// Sends are fire-and-forget: `Sent` means the message was handed to the
/// session, not that the venue accepted it. Acceptance arrives later as an
/// execution report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the session for transmission.
    Sent,
    /// No established session to send on.
    SessionUnavailable,
    /// Send failed with an error.
    Failed(String),
}

impl SendOutcome {
    /// Check if the send was handed off.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Sent)
    }
}

/// Trait for handing outbound messages to the venue session.
///
/// Implementations also receive an inbound channel sender at construction
/// and push one decoded `InboundReport` per venue message into it; that path
/// must never block on pipeline work, which is why the channel is unbounded
/// and attribution happens downstream.
pub trait Transport: Send + Sync {
    /// Send one message. Fire-and-forget; the outcome is in-band.
    fn send(&self, message: OutboundMessage) -> BoxFuture<'_, SendOutcome>;
}

/// Arc wrapper for Transport trait objects.
pub type DynTransport = Arc<dyn Transport>;

/// Mock transport for testing.
#[derive(Debug)]
pub struct MockTransport {
    /// Recorded sends for verification.
    sends: parking_lot::Mutex<Vec<OutboundMessage>>,
    /// Next outcome to return.
    next_outcome: parking_lot::Mutex<SendOutcome>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sends: parking_lot::Mutex::new(Vec::new()),
            next_outcome: parking_lot::Mutex::new(SendOutcome::Sent),
        }
    }

    /// Set the outcome returned by subsequent sends.
    pub fn set_next_outcome(&self, outcome: SendOutcome) {
        *self.next_outcome.lock() = outcome;
    }

    /// Get recorded sends.
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sends.lock().clone()
    }

    /// Clear recorded sends.
    pub fn clear_sent(&self) {
        self.sends.lock().clear();
    }
}

impl Transport for MockTransport {
    fn send(&self, message: OutboundMessage) -> BoxFuture<'_, SendOutcome> {
        Box::pin(async move {
            self.sends.lock().push(message);
            self.next_outcome.lock().clone()
        })
    }
}
