//! Booking aggregate implementation.

use chrono::{DateTime, Duration, Utc};
use common::{BookingId, ShowId, UserId};
use serde::{Deserialize, Serialize};

use super::{BookingError, BookingReference, BookingStatus};
use crate::money::Money;
use crate::payment::Payment;
use crate::seat::{SeatNumber, SeatSelection};

/// A user's booking of one or more seats of a show.
///
/// Status changes go through the methods below, which enforce the booking
/// state machine. Persisting a change is the ledger's job: it writes the new
/// state only if the stored status still equals the status the change started
/// from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    id: BookingId,
    reference: BookingReference,
    user_id: UserId,
    show_id: ShowId,
    seats: SeatSelection,
    total_amount: Money,
    status: BookingStatus,
    payment: Option<Payment>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Every stored field of a booking, used by stores to rebuild one.
#[derive(Debug, Clone)]
pub struct BookingParts {
    pub id: BookingId,
    pub reference: BookingReference,
    pub user_id: UserId,
    pub show_id: ShowId,
    pub seats: SeatSelection,
    pub total_amount: Money,
    pub status: BookingStatus,
    pub payment: Option<Payment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a pending booking for seats that have just been blocked.
    ///
    /// The total is `unit_price × number of seats`.
    pub fn pending(
        id: BookingId,
        reference: BookingReference,
        user_id: UserId,
        show_id: ShowId,
        seats: SeatSelection,
        unit_price: Money,
    ) -> Self {
        let now = Utc::now();
        let total_amount = unit_price.multiply(seats.len() as u32);
        Self {
            id,
            reference,
            user_id,
            show_id,
            seats,
            total_amount,
            status: BookingStatus::Pending,
            payment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a booking from stored fields.
    pub fn from_parts(parts: BookingParts) -> Self {
        Self {
            id: parts.id,
            reference: parts.reference,
            user_id: parts.user_id,
            show_id: parts.show_id,
            seats: parts.seats,
            total_amount: parts.total_amount,
            status: parts.status,
            payment: parts.payment,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    // Query methods

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn reference(&self) -> &BookingReference {
        &self.reference
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn show_id(&self) -> ShowId {
        self.show_id
    }

    pub fn seats(&self) -> &SeatSelection {
        &self.seats
    }

    /// Returns the booked seat numbers in request order.
    pub fn seat_numbers(&self) -> &[SeatNumber] {
        self.seats.seats()
    }

    pub fn number_of_seats(&self) -> usize {
        self.seats.len()
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if this pending booking's hold is older than `ttl` at `now`.
    pub fn hold_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.status == BookingStatus::Pending && now - self.created_at >= ttl
    }

    // Transitions

    /// Confirms the booking with a successful payment for the exact total.
    pub fn confirm(&mut self, payment: Payment) -> Result<(), BookingError> {
        self.ensure(self.status.can_confirm(), "confirm")?;
        if payment.booking_id != self.id {
            return Err(BookingError::PaymentBookingMismatch);
        }
        if payment.amount != self.total_amount {
            return Err(BookingError::PaymentAmountMismatch {
                expected: self.total_amount,
                actual: payment.amount,
            });
        }
        self.payment = Some(payment);
        self.move_to(BookingStatus::Confirmed);
        Ok(())
    }

    /// Cancels a pending or confirmed booking.
    ///
    /// Returns the status the booking was cancelled from.
    pub fn cancel(&mut self) -> Result<BookingStatus, BookingError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        let previous = self.status;
        self.move_to(BookingStatus::Cancelled);
        Ok(previous)
    }

    /// Cancels a pending booking whose hold ran out.
    pub fn expire(&mut self) -> Result<(), BookingError> {
        self.ensure(self.status == BookingStatus::Pending, "expire")?;
        self.move_to(BookingStatus::Cancelled);
        Ok(())
    }

    /// Marks a pending booking failed after its seats could not be confirmed.
    pub fn fail(&mut self) -> Result<(), BookingError> {
        self.ensure(self.status.can_fail(), "fail")?;
        self.move_to(BookingStatus::Failed);
        Ok(())
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), BookingError> {
        if allowed {
            Ok(())
        } else {
            Err(BookingError::InvalidStateTransition {
                current_state: self.status,
                action,
            })
        }
    }

    fn move_to(&mut self, next: BookingStatus) {
        debug_assert!(self.status.can_transition_to(next));
        self.status = next;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::PaymentMethod;

    fn pending_booking() -> Booking {
        Booking::pending(
            BookingId::new(),
            BookingReference::generate(),
            UserId::new(),
            ShowId::new(),
            SeatSelection::parse(["A1", "A2"]).unwrap(),
            Money::from_major(250),
        )
    }

    #[test]
    fn test_pending_booking_totals() {
        let booking = pending_booking();
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert_eq!(booking.number_of_seats(), 2);
        assert_eq!(booking.total_amount(), Money::from_major(500));
        assert!(booking.payment().is_none());
    }

    #[test]
    fn test_confirm_attaches_payment() {
        let mut booking = pending_booking();
        let payment =
            Payment::successful(booking.id(), booking.total_amount(), PaymentMethod::Card);

        booking.confirm(payment.clone()).unwrap();

        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.payment(), Some(&payment));
    }

    #[test]
    fn test_confirm_rejects_wrong_amount() {
        let mut booking = pending_booking();
        let payment = Payment::successful(booking.id(), Money::from_major(1), PaymentMethod::Upi);

        let err = booking.confirm(payment).unwrap_err();
        assert!(matches!(err, BookingError::PaymentAmountMismatch { .. }));
        assert_eq!(booking.status(), BookingStatus::Pending);
    }

    #[test]
    fn test_confirm_rejects_foreign_payment() {
        let mut booking = pending_booking();
        let payment = Payment::successful(
            BookingId::new(),
            booking.total_amount(),
            PaymentMethod::Card,
        );
        assert_eq!(
            booking.confirm(payment).unwrap_err(),
            BookingError::PaymentBookingMismatch
        );
    }

    #[test]
    fn test_cancel_from_confirmed_reports_previous_status() {
        let mut booking = pending_booking();
        let payment =
            Payment::successful(booking.id(), booking.total_amount(), PaymentMethod::Card);
        booking.confirm(payment).unwrap();

        assert_eq!(booking.cancel().unwrap(), BookingStatus::Confirmed);
        assert_eq!(booking.status(), BookingStatus::Cancelled);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let mut cancelled = pending_booking();
        cancelled.cancel().unwrap();
        assert!(cancelled.cancel().is_err());
        assert!(cancelled.fail().is_err());
        assert!(cancelled.expire().is_err());

        let mut failed = pending_booking();
        failed.fail().unwrap();
        let payment = Payment::successful(failed.id(), failed.total_amount(), PaymentMethod::Card);
        assert!(matches!(
            failed.confirm(payment),
            Err(BookingError::InvalidStateTransition {
                current_state: BookingStatus::Failed,
                action: "confirm"
            })
        ));
        assert_eq!(failed.status(), BookingStatus::Failed);
    }

    #[test]
    fn test_expire_only_from_pending() {
        let mut booking = pending_booking();
        let payment =
            Payment::successful(booking.id(), booking.total_amount(), PaymentMethod::Card);
        booking.confirm(payment).unwrap();
        assert!(booking.expire().is_err());
        assert_eq!(booking.status(), BookingStatus::Confirmed);
    }

    #[test]
    fn test_hold_expired() {
        let booking = pending_booking();
        let ttl = Duration::minutes(10);
        assert!(!booking.hold_expired(booking.created_at(), ttl));
        assert!(booking.hold_expired(booking.created_at() + Duration::minutes(10), ttl));
    }
}
