use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use common::ShowId;
use domain::{Seat, SeatNumber, SeatSelection, ShowInventory};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::seats::{SeatStore, SeatTransition, TransitionOutcome};
use crate::{Result, StoreError};

#[derive(Debug)]
struct ShowState {
    seats: BTreeMap<SeatNumber, Seat>,
    inventory: ShowInventory,
}

/// One show's seat rows.
///
/// Each seat has its own row lock, held for the whole transition. The
/// `committed` latch is only taken synchronously, after every row lock is
/// held, so transitions on disjoint seats never wait on each other for
/// longer than the in-memory write.
#[derive(Debug)]
struct ShowTable {
    row_locks: BTreeMap<SeatNumber, Arc<Mutex<()>>>,
    committed: std::sync::RwLock<ShowState>,
}

impl ShowTable {
    fn new(show_id: ShowId, seat_numbers: Vec<SeatNumber>) -> Self {
        let now = Utc::now();
        let seats: BTreeMap<_, _> = seat_numbers
            .into_iter()
            .map(|number| {
                let mut seat = Seat::available(show_id, number.clone());
                seat.last_modified = now;
                (number, seat)
            })
            .collect();
        let row_locks = seats
            .keys()
            .map(|number| (number.clone(), Arc::new(Mutex::new(()))))
            .collect();
        let inventory = ShowInventory::new(show_id, seats.len() as u32);

        Self {
            row_locks,
            committed: std::sync::RwLock::new(ShowState { seats, inventory }),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&ShowState) -> R) -> R {
        let state = self.committed.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Validates and applies a transition. Callers must hold the row locks
    /// of every seat in `order`.
    fn commit(
        &self,
        order: &[&SeatNumber],
        transition: SeatTransition,
    ) -> Result<TransitionOutcome> {
        let mut state = self
            .committed
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let show_id = state.inventory.show_id;

        let changed = transition.plan(
            show_id,
            order.iter().filter_map(|number| state.seats.get(*number)),
        )?;
        if changed.is_empty() {
            return Ok(TransitionOutcome {
                changed,
                inventory: state.inventory,
            });
        }

        let delta = transition.available_delta(changed.len());
        let available = i64::from(state.inventory.available_seats) + delta;
        let available = u32::try_from(available)
            .ok()
            .filter(|available| *available <= state.inventory.total_seats)
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "available seats of show {show_id} would become {available}"
                ))
            })?;

        let now = Utc::now();
        for number in &changed {
            if let Some(seat) = state.seats.get_mut(number) {
                transition.apply(seat, now);
            }
        }
        state.inventory.available_seats = available;

        Ok(TransitionOutcome {
            changed,
            inventory: state.inventory,
        })
    }
}

/// In-memory seat store for tests and local runs.
///
/// Mirrors the PostgreSQL backend's locking: row locks are taken per seat in
/// lexicographic order, and the show's counter is written under the same
/// unit of work as the seats.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeatStore {
    shows: Arc<RwLock<HashMap<ShowId, Arc<ShowTable>>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySeatStore {
    /// Creates a new empty seat store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent transition fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of shows with a seat map.
    pub async fn show_count(&self) -> usize {
        self.shows.read().await.len()
    }

    async fn table(&self, show_id: ShowId) -> Result<Arc<ShowTable>> {
        self.shows
            .read()
            .await
            .get(&show_id)
            .cloned()
            .ok_or(StoreError::ShowNotFound(show_id))
    }
}

#[async_trait]
impl SeatStore for InMemorySeatStore {
    async fn create_show(
        &self,
        show_id: ShowId,
        seats: Vec<SeatNumber>,
    ) -> Result<ShowInventory> {
        let mut shows = self.shows.write().await;
        if shows.contains_key(&show_id) {
            return Err(StoreError::ShowAlreadyExists(show_id));
        }

        let table = Arc::new(ShowTable::new(show_id, seats));
        let inventory = table.read(|state| state.inventory);
        shows.insert(show_id, table);

        tracing::debug!(%show_id, total_seats = inventory.total_seats, "Created seat map");
        Ok(inventory)
    }

    async fn transition(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        transition: SeatTransition,
    ) -> Result<TransitionOutcome> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("seat store is offline".to_string()));
        }

        let table = self.table(show_id).await?;
        let order = seats.lock_order();

        let missing: Vec<SeatNumber> = order
            .iter()
            .filter(|number| !table.row_locks.contains_key(**number))
            .map(|number| (*number).clone())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::SeatNotFound {
                show_id,
                seats: missing,
            });
        }

        let mut guards: Vec<OwnedMutexGuard<()>> = Vec::with_capacity(order.len());
        for number in &order {
            if let Some(lock) = table.row_locks.get(*number) {
                guards.push(Arc::clone(lock).lock_owned().await);
            }
        }

        let outcome = table.commit(&order, transition);
        drop(guards);
        outcome
    }

    async fn seats(&self, show_id: ShowId) -> Result<Vec<Seat>> {
        let table = self.table(show_id).await?;
        Ok(table.read(|state| state.seats.values().cloned().collect()))
    }

    async fn inventory(&self, show_id: ShowId) -> Result<ShowInventory> {
        let table = self.table(show_id).await?;
        Ok(table.read(|state| state.inventory))
    }
}
