//! Applies broadcast invalidations to a [`SeatCache`].

use reservation::Invalidation;
use store::SeatStore;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::SeatCache;

/// Consumes invalidation messages and evicts the matching cache entries.
///
/// A receiver that falls behind has lost messages it cannot replay, so the
/// whole cache is cleared.
pub struct CacheListener<S>
where
    S: SeatStore,
{
    cache: SeatCache<S>,
    receiver: broadcast::Receiver<Invalidation>,
}

impl<S> CacheListener<S>
where
    S: SeatStore,
{
    pub fn new(cache: SeatCache<S>, receiver: broadcast::Receiver<Invalidation>) -> Self {
        Self { cache, receiver }
    }
}

impl<S> CacheListener<S>
where
    S: SeatStore + 'static,
{
    /// Runs until the channel closes, `shutdown` turns true, or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("seat cache listener started");
        loop {
            tokio::select! {
                received = self.receiver.recv() => match received {
                    Ok(invalidation) => self.cache.invalidate(invalidation).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "cache listener lagged, clearing cache");
                        metrics::counter!("seat_cache_resets").increment(1);
                        self.cache.clear().await;
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("seat cache listener stopped");
    }

    /// Spawns [`run`](Self::run) onto the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
