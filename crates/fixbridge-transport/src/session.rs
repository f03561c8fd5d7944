//! Shared venue session state.
//!
//! One [`SessionGate`] per transport session. Transport implementations mark
//! it up on logon and down on logout; the dispatch scheduler also marks it
//! down when a send fails, and pauses until the gate reopens. Listeners
//! observe transitions through a watch channel.

use tokio::sync::watch;
use tracing::{info, warn};

/// Connected/disconnected state of the venue session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Up,
    Down,
}

/// Shared session flag with change signalling.
///
/// Starts `Down`; the owning transport flips it up once its session is
/// established.
#[derive(Debug)]
pub struct SessionGate {
    tx: watch::Sender<SessionState>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Down);
        Self { tx }
    }

    #[must_use]
    pub fn is_up(&self) -> bool {
        *self.tx.borrow() == SessionState::Up
    }

    /// Marks the session up. No-op (and no wakeup) if already up.
    pub fn mark_up(&self) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == SessionState::Up {
                false
            } else {
                *state = SessionState::Up;
                true
            }
        });
        if changed {
            info!("Venue session up");
        }
    }

    /// Marks the session down. No-op (and no wakeup) if already down.
    pub fn mark_down(&self) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == SessionState::Down {
                false
            } else {
                *state = SessionState::Down;
                true
            }
        });
        if changed {
            warn!("Venue session down");
        }
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Waits until the session is up. Returns immediately if it already is.
    pub async fn wait_until_up(&self) {
        let mut rx = self.tx.subscribe();
        // The gate owns the sender, so wait_for cannot observe a closed channel here.
        let _ = rx.wait_for(|state| *state == SessionState::Up).await;
    }
}
