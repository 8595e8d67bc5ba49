//! Cache invalidation messages emitted after committed seat changes.

use common::ShowId;
use serde::Serialize;
use tokio::sync::broadcast;

/// Which read model an invalidation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// A show's seat list.
    Seats,
    /// A show's inventory counters.
    Shows,
}

impl CacheScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheScope::Seats => "seats",
            CacheScope::Shows => "shows",
        }
    }
}

impl std::fmt::Display for CacheScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One invalidation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    pub scope: CacheScope,
    pub show_id: ShowId,
}

/// Receives a notification after each committed mutation.
///
/// Delivery is best-effort and unacknowledged; implementations must not block.
pub trait InvalidationSignal: Send + Sync {
    fn invalidate(&self, scope: CacheScope, show_id: ShowId);
}

/// Drops every invalidation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl InvalidationSignal for NoopInvalidator {
    fn invalidate(&self, _scope: CacheScope, _show_id: ShowId) {}
}

/// Fans invalidations out to every subscriber over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastInvalidator {
    sender: broadcast::Sender<Invalidation>,
}

impl BroadcastInvalidator {
    /// Creates an invalidator whose subscribers buffer up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to invalidations sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastInvalidator {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl InvalidationSignal for BroadcastInvalidator {
    fn invalidate(&self, scope: CacheScope, show_id: ShowId) {
        // No subscribers is fine.
        let _ = self.sender.send(Invalidation { scope, show_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let invalidator = BroadcastInvalidator::new(8);
        let mut rx = invalidator.subscribe();
        let show_id = ShowId::new();

        invalidator.invalidate(CacheScope::Seats, show_id);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.scope, CacheScope::Seats);
        assert_eq!(msg.show_id, show_id);
    }

    #[test]
    fn test_send_without_subscribers_is_silent() {
        let invalidator = BroadcastInvalidator::default();
        invalidator.invalidate(CacheScope::Shows, ShowId::new());
        NoopInvalidator.invalidate(CacheScope::Shows, ShowId::new());
    }
}
