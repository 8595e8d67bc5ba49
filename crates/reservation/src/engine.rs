//! Seat-level concurrency control.

use std::sync::Arc;
use std::time::Instant;

use common::{BookingId, ShowId};
use domain::{Seat, SeatLayout, SeatSelection, SeatStatus, ShowInventory};
use store::{SeatStore, SeatStoreExt, SeatTransition, TransitionOutcome};

use crate::error::{ReservationError, Result};
use crate::invalidation::{CacheScope, InvalidationSignal, NoopInvalidator};

/// Blocks, confirms and releases seats.
///
/// Every mutating call is one atomic unit of work in the underlying
/// [`SeatStore`]: it locks only the requested seat rows (in lexicographic
/// order), validates all of them, then writes the seats and the show's
/// available counter together. A call that fails mutates nothing.
///
/// ```text
///              block(holder)           confirm(holder)
/// AVAILABLE ─────────────────▶ BLOCKED ─────────────────▶ BOOKED
///     ▲                           │                          │
///     └──── release(holder) ──────┘                          │
///     └──────────────── release_booked(holder) ──────────────┘
/// ```
///
/// After each commit that changed at least one seat, both the `seats` and
/// the `shows` read models of the show are invalidated.
pub struct ReservationEngine<S>
where
    S: SeatStore,
{
    seats: S,
    signal: Arc<dyn InvalidationSignal>,
}

impl<S> ReservationEngine<S>
where
    S: SeatStore,
{
    /// Creates an engine that emits no invalidations.
    pub fn new(seats: S) -> Self {
        Self {
            seats,
            signal: Arc::new(NoopInvalidator),
        }
    }

    /// Sets where invalidations are sent.
    pub fn with_invalidation(mut self, signal: Arc<dyn InvalidationSignal>) -> Self {
        self.signal = signal;
        self
    }

    /// Returns a reference to the underlying seat store.
    pub fn store(&self) -> &S {
        &self.seats
    }

    /// Creates the seat map of a new show from a theater layout.
    #[tracing::instrument(skip(self))]
    pub async fn create_show(&self, show_id: ShowId, layout: SeatLayout) -> Result<ShowInventory> {
        let inventory = self
            .seats
            .create_show(show_id, layout.seat_numbers())
            .await?;
        self.notify(show_id);

        tracing::info!(total_seats = inventory.total_seats, "show seat map created");
        Ok(inventory)
    }

    /// Holds every requested seat for `holder`, or none of them.
    ///
    /// Fails with `SeatUnavailable` naming the first seat (in lock order) that
    /// is not available.
    #[tracing::instrument(skip(self, seats), fields(seat_count = seats.len()))]
    pub async fn block(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        holder: BookingId,
    ) -> Result<TransitionOutcome> {
        metrics::counter!("seat_block_total").increment(1);

        let result = self
            .run(show_id, seats, SeatTransition::block(holder), "block")
            .await;
        match &result {
            Ok(outcome) => tracing::info!(
                available_seats = outcome.inventory.available_seats,
                "seats blocked"
            ),
            Err(ReservationError::SeatUnavailable { seat }) => {
                metrics::counter!("seat_block_conflicts").increment(1);
                tracing::debug!(%seat, "seat already taken");
            }
            Err(_) => {}
        }
        result
    }

    /// Books every seat `holder` has blocked, or none of them.
    #[tracing::instrument(skip(self, seats), fields(seat_count = seats.len()))]
    pub async fn confirm(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        holder: BookingId,
    ) -> Result<TransitionOutcome> {
        let outcome = self
            .run(show_id, seats, SeatTransition::confirm(holder), "confirm")
            .await?;
        tracing::info!("seats booked");
        Ok(outcome)
    }

    /// Returns seats blocked by `holder` to available.
    ///
    /// Idempotent: seats in any other state, or held by someone else, are
    /// left untouched.
    #[tracing::instrument(skip(self, seats), fields(seat_count = seats.len()))]
    pub async fn release(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        holder: BookingId,
    ) -> Result<TransitionOutcome> {
        let outcome = self
            .run(show_id, seats, SeatTransition::release(holder), "release")
            .await?;
        tracing::info!(released = outcome.changed.len(), "seat hold released");
        Ok(outcome)
    }

    /// Returns seats booked by `holder` to available.
    #[tracing::instrument(skip(self, seats), fields(seat_count = seats.len()))]
    pub async fn release_booked(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        holder: BookingId,
    ) -> Result<TransitionOutcome> {
        let outcome = self
            .run(
                show_id,
                seats,
                SeatTransition::release_booked(holder),
                "release_booked",
            )
            .await?;
        tracing::info!(released = outcome.changed.len(), "booked seats released");
        Ok(outcome)
    }

    /// Moves seats booked by `holder` back to blocked.
    #[tracing::instrument(skip(self, seats), fields(seat_count = seats.len()))]
    pub async fn revert_confirm(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        holder: BookingId,
    ) -> Result<TransitionOutcome> {
        self.run(
            show_id,
            seats,
            SeatTransition::revert_confirm(holder),
            "revert_confirm",
        )
        .await
    }

    // Queries

    /// Returns every seat of a show, ordered by seat number.
    pub async fn seats(&self, show_id: ShowId) -> Result<Vec<Seat>> {
        Ok(self.seats.seats(show_id).await?)
    }

    pub async fn available_seats(&self, show_id: ShowId) -> Result<Vec<Seat>> {
        Ok(self
            .seats
            .seats_with_status(show_id, SeatStatus::Available)
            .await?)
    }

    pub async fn booked_seats(&self, show_id: ShowId) -> Result<Vec<Seat>> {
        Ok(self
            .seats
            .seats_with_status(show_id, SeatStatus::Booked)
            .await?)
    }

    pub async fn seat_count(&self, show_id: ShowId) -> Result<u32> {
        Ok(self.seats.seat_count(show_id).await?)
    }

    pub async fn inventory(&self, show_id: ShowId) -> Result<ShowInventory> {
        Ok(self.seats.inventory(show_id).await?)
    }

    async fn run(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        transition: SeatTransition,
        operation: &'static str,
    ) -> Result<TransitionOutcome> {
        let start = Instant::now();
        let result = self.seats.transition(show_id, seats, transition).await;
        metrics::histogram!("seat_operation_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());

        let outcome = result?;
        if !outcome.changed.is_empty() {
            self.notify(show_id);
        }
        Ok(outcome)
    }

    fn notify(&self, show_id: ShowId) {
        self.signal.invalidate(CacheScope::Seats, show_id);
        self.signal.invalidate(CacheScope::Shows, show_id);
    }
}
