//! Booking commands.

use common::{BookingId, ShowId, UserId};

/// Command to hold seats for a user and open a pending booking.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: UserId,
    pub show_id: ShowId,
    /// Raw seat labels; validated before any seat is locked.
    pub seat_numbers: Vec<String>,
}

impl CreateBooking {
    /// Creates a new CreateBooking command.
    pub fn new<I, S>(user_id: UserId, show_id: ShowId, seat_numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id,
            show_id,
            seat_numbers: seat_numbers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Command to pay for and confirm a pending booking.
#[derive(Debug, Clone)]
pub struct ConfirmBooking {
    pub booking_id: BookingId,
    /// One of `CARD`, `UPI`, `NET_BANKING`, `WALLET` (case-insensitive).
    pub payment_method: String,
}

impl ConfirmBooking {
    /// Creates a new ConfirmBooking command.
    pub fn new(booking_id: BookingId, payment_method: impl Into<String>) -> Self {
        Self {
            booking_id,
            payment_method: payment_method.into(),
        }
    }
}

/// Command to cancel a pending or confirmed booking.
#[derive(Debug, Clone, Copy)]
pub struct CancelBooking {
    pub booking_id: BookingId,
}

impl CancelBooking {
    /// Creates a new CancelBooking command.
    pub fn new(booking_id: BookingId) -> Self {
        Self { booking_id }
    }
}
