use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, ShowId};
use domain::{Seat, SeatNumber, SeatSelection, SeatStatus, ShowInventory};

use crate::{Result, StoreError};

/// How a transition treats seats that are not in its source status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionMode {
    /// Every seat must match, otherwise nothing changes.
    AllOrNothing,
    /// Matching seats change, the rest are left untouched.
    MatchingOnly,
}

/// A conditional multi-row seat update: every seat in `from` (and, unless
/// `from` is `Available`, held by `holder`) moves to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatTransition {
    pub from: SeatStatus,
    pub to: SeatStatus,
    pub holder: BookingId,
    pub mode: TransitionMode,
}

impl SeatTransition {
    /// AVAILABLE → BLOCKED, all or nothing.
    pub fn block(holder: BookingId) -> Self {
        Self {
            from: SeatStatus::Available,
            to: SeatStatus::Blocked,
            holder,
            mode: TransitionMode::AllOrNothing,
        }
    }

    /// BLOCKED by `holder` → BOOKED, all or nothing.
    pub fn confirm(holder: BookingId) -> Self {
        Self {
            from: SeatStatus::Blocked,
            to: SeatStatus::Booked,
            holder,
            mode: TransitionMode::AllOrNothing,
        }
    }

    /// BLOCKED by `holder` → AVAILABLE; other seats untouched.
    pub fn release(holder: BookingId) -> Self {
        Self {
            from: SeatStatus::Blocked,
            to: SeatStatus::Available,
            holder,
            mode: TransitionMode::MatchingOnly,
        }
    }

    /// BOOKED by `holder` → AVAILABLE; other seats untouched.
    pub fn release_booked(holder: BookingId) -> Self {
        Self {
            from: SeatStatus::Booked,
            to: SeatStatus::Available,
            holder,
            mode: TransitionMode::MatchingOnly,
        }
    }

    /// BOOKED by `holder` → BLOCKED; undoes a confirm whose booking write failed.
    pub fn revert_confirm(holder: BookingId) -> Self {
        Self {
            from: SeatStatus::Booked,
            to: SeatStatus::Blocked,
            holder,
            mode: TransitionMode::MatchingOnly,
        }
    }

    /// Returns true if `seat` is in this transition's source state.
    pub fn matches(&self, seat: &Seat) -> bool {
        match self.from {
            SeatStatus::Available => seat.is_available(),
            status => seat.is_held_by(status, self.holder),
        }
    }

    /// Applies the transition to a seat that [`matches`](Self::matches).
    pub fn apply(&self, seat: &mut Seat, now: DateTime<Utc>) {
        seat.status = self.to;
        seat.held_by = match self.to {
            SeatStatus::Available => None,
            _ => Some(self.holder),
        };
        seat.last_modified = now;
    }

    /// Change of the show's available counter when `changed` seats move.
    pub fn available_delta(&self, changed: usize) -> i64 {
        let changed = changed as i64;
        match (self.from, self.to) {
            (SeatStatus::Available, SeatStatus::Available) => 0,
            (SeatStatus::Available, _) => -changed,
            (_, SeatStatus::Available) => changed,
            _ => 0,
        }
    }

    /// Checks the seats locked for this transition.
    ///
    /// Returns the seats that will change, or the first seat (in lock order)
    /// that blocks an all-or-nothing transition.
    pub fn plan<'a>(
        &self,
        show_id: ShowId,
        locked: impl IntoIterator<Item = &'a Seat>,
    ) -> Result<Vec<SeatNumber>> {
        let mut changing = Vec::new();
        for seat in locked {
            if self.matches(seat) {
                changing.push(seat.seat_number.clone());
            } else if self.mode == TransitionMode::AllOrNothing {
                return Err(StoreError::SeatUnavailable {
                    show_id,
                    seat: seat.seat_number.clone(),
                    status: seat.status,
                });
            }
        }
        Ok(changing)
    }
}

/// Result of a committed seat transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Seats whose status changed, in lock order.
    pub changed: Vec<SeatNumber>,
    /// The show's counters after the commit.
    pub inventory: ShowInventory,
}

/// Keyed storage of seat rows per show, with an atomic conditional
/// multi-row update.
///
/// Implementations must run [`transition`](SeatStore::transition) as one
/// atomic unit of work:
/// - lock exactly the requested seat rows, in lexicographic seat-number order
/// - fail with `SeatNotFound` if any requested seat does not exist
/// - validate via [`SeatTransition::plan`] before writing anything
/// - write the seats and the show's available counter in the same commit,
///   taking the counter last
#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Creates the seat map and inventory row of a new show, every seat available.
    async fn create_show(&self, show_id: ShowId, seats: Vec<SeatNumber>)
    -> Result<ShowInventory>;

    /// Atomically applies `transition` to the selected seats.
    async fn transition(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        transition: SeatTransition,
    ) -> Result<TransitionOutcome>;

    /// Returns every seat of a show, ordered by seat number.
    async fn seats(&self, show_id: ShowId) -> Result<Vec<Seat>>;

    /// Returns the show's seat counters.
    async fn inventory(&self, show_id: ShowId) -> Result<ShowInventory>;
}

/// Extension trait providing convenience queries for seat stores.
#[async_trait]
pub trait SeatStoreExt: SeatStore {
    /// Returns the show's seats in `status`, ordered by seat number.
    async fn seats_with_status(&self, show_id: ShowId, status: SeatStatus) -> Result<Vec<Seat>> {
        Ok(self
            .seats(show_id)
            .await?
            .into_iter()
            .filter(|seat| seat.status == status)
            .collect())
    }

    /// Returns the number of seats in the show's seat map.
    async fn seat_count(&self, show_id: ShowId) -> Result<u32> {
        Ok(self.inventory(show_id).await?.total_seats)
    }
}

// Blanket implementation for all SeatStore implementations
impl<T: SeatStore + ?Sized> SeatStoreExt for T {}
