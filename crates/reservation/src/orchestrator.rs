//! Booking lifecycle orchestration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{BookingId, UserId};
use domain::{
    Booking, BookingError, BookingReference, BookingStatus, Payment, PaymentMethod,
    SeatSelection, SeatStatus, ShowDetails,
};
use store::{BookingLedger, SeatStore, StoreError, UniqueConstraint};

use crate::catalog::Catalog;
use crate::commands::{CancelBooking, ConfirmBooking, CreateBooking};
use crate::config::{RefundPolicy, ReservationConfig};
use crate::engine::ReservationEngine;
use crate::error::{ErrorKind, ReservationError, Result};

/// Draws booking references. Replaceable so collisions can be forced in tests.
pub type ReferenceGenerator = Arc<dyn Fn() -> BookingReference + Send + Sync>;

/// Drives bookings through their lifecycle, keeping seats and ledger in step.
///
/// ```text
///          create            confirm
///    ∅ ────────────▶ PENDING ────────▶ CONFIRMED
///                     │  │                │
///        cancel/expire│  │ seats lost     │ cancel
///                     ▼  ▼                ▼
///              CANCELLED  FAILED      CANCELLED
/// ```
///
/// Every booking write is a compare-and-set on the stored status, so two
/// racing transitions of the same booking (a confirm and a hold expiry, say)
/// have exactly one winner. The loser gets `InvalidState` and undoes any seat
/// change it already made.
pub struct BookingOrchestrator<S, L, C>
where
    S: SeatStore,
    L: BookingLedger,
    C: Catalog,
{
    engine: ReservationEngine<S>,
    ledger: L,
    catalog: C,
    config: ReservationConfig,
    next_reference: ReferenceGenerator,
}

impl<S, L, C> BookingOrchestrator<S, L, C>
where
    S: SeatStore,
    L: BookingLedger,
    C: Catalog,
{
    /// Creates a new booking orchestrator.
    pub fn new(
        engine: ReservationEngine<S>,
        ledger: L,
        catalog: C,
        config: ReservationConfig,
    ) -> Self {
        Self {
            engine,
            ledger,
            catalog,
            config,
            next_reference: Arc::new(BookingReference::generate),
        }
    }

    /// Replaces the booking reference generator.
    pub fn with_reference_generator(mut self, generator: ReferenceGenerator) -> Self {
        self.next_reference = generator;
        self
    }

    pub fn engine(&self) -> &ReservationEngine<S> {
        &self.engine
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &ReservationConfig {
        &self.config
    }

    /// Holds the requested seats and records a pending booking.
    ///
    /// Nothing is persisted if the seats cannot be held. If the booking cannot
    /// be recorded, the hold is released before the error is returned.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id, show_id = %cmd.show_id))]
    pub async fn create_booking(&self, cmd: CreateBooking) -> Result<Booking> {
        let seats = SeatSelection::parse(&cmd.seat_numbers)?;
        let show = self.catalog.get_show(cmd.show_id).await?;

        let booking_id = BookingId::new();
        self.engine.block(show.id, &seats, booking_id).await?;

        match self
            .persist_pending(booking_id, cmd.user_id, &show, &seats)
            .await
        {
            Ok(booking) => {
                metrics::counter!("booking_created_total").increment(1);
                tracing::info!(
                    %booking_id,
                    reference = %booking.reference(),
                    total = %booking.total_amount(),
                    "booking created"
                );
                Ok(booking)
            }
            Err(err) => {
                tracing::warn!(%booking_id, error = %err, "booking not recorded, releasing seats");
                if let Err(release_err) = self.engine.release(show.id, &seats, booking_id).await {
                    tracing::error!(%booking_id, error = %release_err, "failed to release seats");
                }
                Err(err)
            }
        }
    }

    /// Pays for a pending booking and books its seats.
    ///
    /// If the seats are no longer held by the booking, it is marked failed,
    /// whatever it still holds is released, and the seat error is returned.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn confirm_booking(&self, cmd: ConfirmBooking) -> Result<Booking> {
        let method: PaymentMethod = cmd.payment_method.parse()?;
        let booking = self.load(cmd.booking_id).await?;
        if !booking.status().can_confirm() {
            return Err(invalid_state(&booking, "confirm"));
        }

        let holder = booking.id();
        if let Err(err) = self
            .engine
            .confirm(booking.show_id(), booking.seats(), holder)
            .await
        {
            return match err {
                ReservationError::SeatUnavailable { .. } | ReservationError::SeatNotFound { .. } => {
                    self.fail_booking(&booking, err).await
                }
                other => Err(other),
            };
        }

        match self.record_confirmation(&booking, method).await {
            Ok(confirmed) => {
                metrics::counter!("booking_confirmed_total").increment(1);
                tracing::info!(
                    reference = %confirmed.reference(),
                    transaction_id = ?confirmed.payment().map(|p| p.transaction_id.as_str()),
                    "booking confirmed"
                );
                Ok(confirmed)
            }
            Err(err) => {
                // The seats are booked under this booking's id; undo that.
                let undo = if err.kind() == ErrorKind::InvalidState {
                    tracing::warn!(error = %err, "lost race after booking seats, releasing them");
                    self.engine
                        .release_booked(booking.show_id(), booking.seats(), holder)
                        .await
                } else {
                    tracing::warn!(error = %err, "confirmation not recorded, restoring hold");
                    self.engine
                        .revert_confirm(booking.show_id(), booking.seats(), holder)
                        .await
                };
                if let Err(undo_err) = undo {
                    tracing::error!(error = %undo_err, "failed to undo seat confirmation");
                }
                Err(err)
            }
        }
    }

    /// Cancels a pending or confirmed booking.
    ///
    /// A pending booking's hold is released. A confirmed booking's seats are
    /// released only under [`RefundPolicy::ReleaseSeats`].
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn cancel_booking(&self, cmd: CancelBooking) -> Result<Booking> {
        let booking = self.load(cmd.booking_id).await?;
        let mut cancelled = booking.clone();
        let previous = cancelled
            .cancel()
            .map_err(|e| booking_error(booking.id(), e))?;

        let cancelled = match previous {
            BookingStatus::Pending => self.close_pending(&booking, cancelled, "cancel").await?,
            _ => self.cancel_confirmed(&booking, cancelled).await?,
        };

        metrics::counter!("booking_cancelled_total").increment(1);
        tracing::info!(from = %previous, "booking cancelled");
        Ok(cancelled)
    }

    /// Cancels a pending booking whose hold timed out.
    #[tracing::instrument(skip(self))]
    pub async fn expire_booking(&self, booking_id: BookingId) -> Result<Booking> {
        let booking = self.load(booking_id).await?;
        let mut expired = booking.clone();
        expired
            .expire()
            .map_err(|e| booking_error(booking.id(), e))?;

        let expired = self.close_pending(&booking, expired, "expire").await?;

        metrics::counter!("holds_expired_total").increment(1);
        tracing::info!("booking hold expired");
        Ok(expired)
    }

    /// Expires every pending booking older than the configured hold TTL at `now`.
    ///
    /// Bookings that were confirmed or cancelled in the meantime are skipped.
    /// Returns the number of bookings expired.
    #[tracing::instrument(skip(self))]
    pub async fn expire_stale_holds(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - self.config.hold_ttl_chrono();
        let stale = self.ledger.list_pending_before(cutoff).await?;

        let mut expired = 0;
        for booking in stale {
            match self.expire_booking(booking.id()).await {
                Ok(_) => expired += 1,
                Err(err) if err.kind() == ErrorKind::InvalidState => {
                    tracing::warn!(booking_id = %booking.id(), error = %err, "hold expiry lost race, skipping");
                }
                Err(err) => {
                    tracing::warn!(booking_id = %booking.id(), error = %err, "failed to expire hold");
                }
            }
        }
        Ok(expired)
    }

    // Queries

    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.load(booking_id).await
    }

    pub async fn get_booking_by_reference(&self, reference: &str) -> Result<Booking> {
        self.ledger
            .get_by_reference(&BookingReference::new(reference))
            .await?
            .ok_or_else(|| ReservationError::BookingNotFound(reference.to_string()))
    }

    /// Returns a user's bookings, newest first.
    pub async fn list_user_bookings(&self, user_id: UserId) -> Result<Vec<Booking>> {
        Ok(self.ledger.list_for_user(user_id).await?)
    }

    async fn load(&self, booking_id: BookingId) -> Result<Booking> {
        self.ledger
            .get(booking_id)
            .await?
            .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))
    }

    async fn persist_pending(
        &self,
        booking_id: BookingId,
        user_id: UserId,
        show: &ShowDetails,
        seats: &SeatSelection,
    ) -> Result<Booking> {
        let attempts = self.config.max_reference_attempts.max(1);
        for attempt in 1..=attempts {
            let booking = Booking::pending(
                booking_id,
                (self.next_reference)(),
                user_id,
                show.id,
                seats.clone(),
                show.price,
            );
            match self.ledger.insert(&booking).await {
                Ok(()) => return Ok(booking),
                Err(StoreError::Conflict {
                    constraint: UniqueConstraint::BookingReference,
                }) => {
                    tracing::warn!(attempt, reference = %booking.reference(), "booking reference taken, redrawing");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(ReservationError::Internal(format!(
            "no unique booking reference after {attempts} attempts"
        )))
    }

    async fn record_confirmation(
        &self,
        booking: &Booking,
        method: PaymentMethod,
    ) -> Result<Booking> {
        let mut payment = Payment::successful(booking.id(), booking.total_amount(), method);
        let attempts = self.config.max_reference_attempts.max(1);
        for attempt in 1..=attempts {
            let mut confirmed = booking.clone();
            confirmed
                .confirm(payment.clone())
                .map_err(|e| booking_error(booking.id(), e))?;

            match self.ledger.update(&confirmed, BookingStatus::Pending).await {
                Ok(()) => return Ok(confirmed),
                Err(StoreError::Conflict {
                    constraint: UniqueConstraint::TransactionId,
                }) => {
                    tracing::warn!(attempt, "transaction id taken, redrawing");
                    payment.redraw_transaction_id();
                }
                Err(err) => return Err(cas_error(booking.id(), err, "confirm")),
            }
        }
        Err(ReservationError::Internal(format!(
            "no unique transaction id after {attempts} attempts"
        )))
    }

    async fn fail_booking(&self, booking: &Booking, cause: ReservationError) -> Result<Booking> {
        // A concurrent confirm of the same booking may already own the seats.
        if self.seats_booked_by(booking).await? {
            return Err(invalid_state(booking, "confirm"));
        }

        let mut failed = booking.clone();
        failed.fail().map_err(|e| booking_error(booking.id(), e))?;
        self.ledger
            .update(&failed, BookingStatus::Pending)
            .await
            .map_err(|e| cas_error(booking.id(), e, "confirm"))?;

        metrics::counter!("booking_failed_total").increment(1);
        tracing::warn!(error = %cause, "seats could not be booked, booking failed");

        if let Err(release_err) = self
            .engine
            .release(booking.show_id(), booking.seats(), booking.id())
            .await
        {
            tracing::error!(error = %release_err, "failed to release seats of failed booking");
        }
        Err(cause)
    }

    async fn seats_booked_by(&self, booking: &Booking) -> Result<bool> {
        let seats = self.engine.seats(booking.show_id()).await?;
        Ok(seats.iter().any(|seat| {
            booking.seats().contains(&seat.seat_number)
                && seat.is_held_by(SeatStatus::Booked, booking.id())
        }))
    }

    /// Records a pending booking's closed status, then releases its hold.
    ///
    /// The status write decides a race with a confirm. Seats the confirm has
    /// already booked are not touched here; its lost write releases them.
    async fn close_pending(
        &self,
        booking: &Booking,
        closed: Booking,
        action: &'static str,
    ) -> Result<Booking> {
        self.ledger
            .update(&closed, BookingStatus::Pending)
            .await
            .map_err(|e| cas_error(booking.id(), e, action))?;

        if let Err(err) = self
            .engine
            .release(booking.show_id(), booking.seats(), booking.id())
            .await
        {
            tracing::error!(error = %err, "booking closed but its hold was not released");
            return Err(ReservationError::Internal(
                "booking closed but its hold was not released".to_string(),
            ));
        }
        Ok(closed)
    }

    /// Records a confirmed booking's cancellation, then applies the refund policy.
    async fn cancel_confirmed(&self, booking: &Booking, cancelled: Booking) -> Result<Booking> {
        self.ledger
            .update(&cancelled, BookingStatus::Confirmed)
            .await
            .map_err(|e| cas_error(booking.id(), e, "cancel"))?;

        if self.config.refund_policy == RefundPolicy::ReleaseSeats
            && let Err(err) = self
                .engine
                .release_booked(booking.show_id(), booking.seats(), booking.id())
                .await
        {
            tracing::error!(error = %err, "booking cancelled but its seats were not released");
            return Err(ReservationError::Internal(
                "booking cancelled but its seats were not released".to_string(),
            ));
        }
        Ok(cancelled)
    }
}

fn invalid_state(booking: &Booking, action: &'static str) -> ReservationError {
    ReservationError::InvalidState {
        booking_id: booking.id(),
        status: booking.status(),
        action,
    }
}

fn booking_error(booking_id: BookingId, err: BookingError) -> ReservationError {
    match err {
        BookingError::InvalidStateTransition {
            current_state,
            action,
        } => ReservationError::InvalidState {
            booking_id,
            status: current_state,
            action,
        },
        other => {
            tracing::error!(%booking_id, error = %other, "booking rejected its own payment");
            ReservationError::Internal(other.to_string())
        }
    }
}

/// Maps a failed compare-and-set write to the caller taxonomy.
fn cas_error(booking_id: BookingId, err: StoreError, action: &'static str) -> ReservationError {
    match err {
        StoreError::StatusMismatch { actual, .. } => ReservationError::InvalidState {
            booking_id,
            status: actual,
            action,
        },
        other => other.into(),
    }
}
