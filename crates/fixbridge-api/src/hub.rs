//! The pub/sub hub.
//!
//! One process-wide broadcast channel carries notices for every subscriber;
//! a group channel per client identity carries targeted notices. Sends are
//! fire-and-forget with no delivery acknowledgment and no cross-group
//! ordering guarantee. Zero-subscriber sends are normal.

use dashmap::DashMap;
use fixbridge_core::ClientId;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::error::ApiResult;
use crate::notice::ReportNotice;

/// Fan-out seam the notification scheduler emits through.
///
/// A trait so tests can record emissions and inject failures.
pub trait Fanout: Send + Sync {
    /// Emit to every subscriber.
    fn broadcast_all(&self, notice: &ReportNotice) -> ApiResult<()>;

    /// Emit to the subscriber group of one client identity.
    fn send_to_group(&self, identity: &ClientId, notice: &ReportNotice) -> ApiResult<()>;
}

/// A subscriber's pair of receivers, handed out on WebSocket connect.
pub struct GroupSubscription {
    pub broadcast: broadcast::Receiver<String>,
    pub group: broadcast::Receiver<String>,
}

/// Broadcast channel plus per-identity group channels.
pub struct Hub {
    capacity: usize,
    broadcast_tx: broadcast::Sender<String>,
    groups: DashMap<ClientId, broadcast::Sender<String>>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (broadcast_tx, _rx) = broadcast::channel(capacity);
        Self {
            capacity,
            broadcast_tx,
            groups: DashMap::new(),
        }
    }

    /// Joins the group for one identity and subscribes to the broadcast
    /// channel. The group channel is created on first join.
    pub fn subscribe(&self, identity: &ClientId) -> GroupSubscription {
        let group = self
            .groups
            .entry(identity.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(%identity, "Subscriber joined group");
        GroupSubscription {
            broadcast: self.broadcast_tx.subscribe(),
            group,
        }
    }

    /// Drops the group channel once its last subscriber has left. Called
    /// after the subscriber's receivers are gone.
    pub fn leave(&self, identity: &ClientId) {
        self.groups
            .remove_if(identity, |_, tx| tx.receiver_count() == 0);
        debug!(%identity, "Subscriber left group");
    }

    /// Currently connected broadcast subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }
}

impl Fanout for Hub {
    fn broadcast_all(&self, notice: &ReportNotice) -> ApiResult<()> {
        let json = serde_json::to_string(notice)?;
        match self.broadcast_tx.send(json) {
            Ok(n) => trace!(receivers = n, "Broadcast notice sent"),
            // No receivers connected; normal.
            Err(_) => trace!("Broadcast notice had no receivers"),
        }
        Ok(())
    }

    fn send_to_group(&self, identity: &ClientId, notice: &ReportNotice) -> ApiResult<()> {
        let json = serde_json::to_string(notice)?;
        match self.groups.get(identity) {
            Some(tx) => match tx.send(json) {
                Ok(n) => trace!(%identity, receivers = n, "Group notice sent"),
                Err(_) => trace!(%identity, "Group notice had no receivers"),
            },
            // Nobody from this group connected; normal.
            None => trace!(%identity, "No group channel, notice skipped"),
        }
        Ok(())
    }
}
