use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, UserId};
use domain::{Booking, BookingReference, BookingStatus};

use crate::Result;

/// Durable record of bookings and their payments.
///
/// Booking writes are compare-and-set on status: [`update`](BookingLedger::update)
/// only persists when the stored status still equals `expected`, so a
/// confirm racing a cancel or an expiry has exactly one winner.
#[async_trait]
pub trait BookingLedger: Send + Sync {
    /// Inserts a new booking.
    ///
    /// Fails with `Conflict` if the id or the reference is already taken.
    async fn insert(&self, booking: &Booking) -> Result<()>;

    /// Returns a booking by id.
    async fn get(&self, booking_id: BookingId) -> Result<Option<Booking>>;

    /// Returns a booking by its human-readable reference.
    async fn get_by_reference(&self, reference: &BookingReference) -> Result<Option<Booking>>;

    /// Returns a user's bookings, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Booking>>;

    /// Returns pending bookings created before `cutoff`, oldest first.
    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Persists `booking` if the stored status equals `expected`.
    ///
    /// The payment is written with the booking when it moves to confirmed.
    /// Fails with `StatusMismatch` if another writer got there first,
    /// `BookingNotFound` if the booking does not exist, or `Conflict` if the
    /// payment's transaction id is already taken.
    async fn update(&self, booking: &Booking, expected: BookingStatus) -> Result<()>;
}
