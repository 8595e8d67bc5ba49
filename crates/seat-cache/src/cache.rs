//! Read-through cache over the reservation engine's queries.

use std::collections::HashMap;
use std::sync::Arc;

use common::ShowId;
use domain::{Seat, SeatStatus, ShowInventory};
use reservation::{CacheScope, Invalidation, ReservationEngine, Result};
use store::SeatStore;
use tokio::sync::{RwLock, broadcast};

use crate::listener::CacheListener;

struct CacheState {
    seats: HashMap<ShowId, Arc<Vec<Seat>>>,
    inventory: HashMap<ShowId, ShowInventory>,
    /// Bumped on every eviction. A fill started before an eviction is dropped.
    generation: u64,
}

/// Caches seat maps and show inventory per show.
///
/// Entries are filled on first read and stay until an [`Invalidation`] for
/// their scope and show evicts them. Reads never take seat locks, so a cached
/// answer may be briefly stale; it is never used to decide a reservation.
pub struct SeatCache<S>
where
    S: SeatStore,
{
    engine: Arc<ReservationEngine<S>>,
    state: Arc<RwLock<CacheState>>,
}

impl<S> Clone for SeatCache<S>
where
    S: SeatStore,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> SeatCache<S>
where
    S: SeatStore,
{
    /// Creates an empty cache reading through `engine`.
    pub fn new(engine: ReservationEngine<S>) -> Self {
        Self {
            engine: Arc::new(engine),
            state: Arc::new(RwLock::new(CacheState {
                seats: HashMap::new(),
                inventory: HashMap::new(),
                generation: 0,
            })),
        }
    }

    /// Returns every seat of a show, ordered by seat number.
    pub async fn seats(&self, show_id: ShowId) -> Result<Vec<Seat>> {
        Ok(self.seat_map(show_id).await?.as_ref().clone())
    }

    /// Returns the available seats of a show from the cached seat map.
    pub async fn available_seats(&self, show_id: ShowId) -> Result<Vec<Seat>> {
        let seats = self.seat_map(show_id).await?;
        Ok(seats
            .iter()
            .filter(|seat| seat.status == SeatStatus::Available)
            .cloned()
            .collect())
    }

    /// Returns a show's seat counters.
    pub async fn inventory(&self, show_id: ShowId) -> Result<ShowInventory> {
        let generation = {
            let state = self.state.read().await;
            if let Some(inventory) = state.inventory.get(&show_id) {
                metrics::counter!("seat_cache_hits", "scope" => "shows").increment(1);
                return Ok(*inventory);
            }
            state.generation
        };
        metrics::counter!("seat_cache_misses", "scope" => "shows").increment(1);

        let inventory = self.engine.inventory(show_id).await?;
        let mut state = self.state.write().await;
        if state.generation == generation {
            state.inventory.insert(show_id, inventory);
        }
        Ok(inventory)
    }

    /// Evicts the entry an invalidation names.
    pub async fn invalidate(&self, invalidation: Invalidation) {
        let mut state = self.state.write().await;
        state.generation += 1;
        match invalidation.scope {
            CacheScope::Seats => {
                state.seats.remove(&invalidation.show_id);
            }
            CacheScope::Shows => {
                state.inventory.remove(&invalidation.show_id);
            }
        }
        tracing::trace!(
            scope = %invalidation.scope,
            show_id = %invalidation.show_id,
            "cache entry evicted"
        );
    }

    /// Evicts everything.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.seats.clear();
        state.inventory.clear();
    }

    /// Number of cached entries across both scopes.
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.seats.len() + state.inventory.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Creates a listener that applies invalidations from `receiver` to this cache.
    pub fn listen(&self, receiver: broadcast::Receiver<Invalidation>) -> CacheListener<S> {
        CacheListener::new(self.clone(), receiver)
    }

    async fn seat_map(&self, show_id: ShowId) -> Result<Arc<Vec<Seat>>> {
        let generation = {
            let state = self.state.read().await;
            if let Some(seats) = state.seats.get(&show_id) {
                metrics::counter!("seat_cache_hits", "scope" => "seats").increment(1);
                return Ok(Arc::clone(seats));
            }
            state.generation
        };
        metrics::counter!("seat_cache_misses", "scope" => "seats").increment(1);

        let seats = Arc::new(self.engine.seats(show_id).await?);
        let mut state = self.state.write().await;
        if state.generation == generation {
            state.seats.insert(show_id, Arc::clone(&seats));
        }
        Ok(seats)
    }
}
