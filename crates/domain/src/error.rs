//! Domain error types.

use thiserror::Error;

use crate::booking::BookingError;
use crate::seat::SeatNumber;

/// Errors raised while validating domain input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A seat number is blank, too long or contains unsupported characters.
    #[error("Invalid seat number: {0:?}")]
    InvalidSeatNumber(String),

    /// A seat selection must name at least one seat.
    #[error("Seat selection is empty")]
    EmptySeatSelection,

    /// A seat selection named the same seat more than once.
    #[error("Seat {0} requested more than once")]
    DuplicateSeat(SeatNumber),

    /// The payment method is not one of the supported methods.
    #[error("Unsupported payment method: {0}")]
    UnsupportedPaymentMethod(String),

    /// A seat layout with no rows, no seats per row, or more rows than letters.
    #[error("Invalid seat layout: {rows} rows x {seats_per_row} seats")]
    InvalidLayout { rows: u32, seats_per_row: u32 },

    /// An error raised by the booking state machine.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),
}
