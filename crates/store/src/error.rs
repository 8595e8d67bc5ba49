use common::{BookingId, ShowId};
use domain::{BookingStatus, SeatNumber, SeatStatus};
use thiserror::Error;

/// Unique constraints enforced by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    BookingId,
    BookingReference,
    TransactionId,
}

impl std::fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UniqueConstraint::BookingId => "booking id",
            UniqueConstraint::BookingReference => "booking reference",
            UniqueConstraint::TransactionId => "transaction id",
        };
        write!(f, "{name}")
    }
}

/// Errors that can occur when reading or writing the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The show has no seat map.
    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    /// A seat map already exists for the show.
    #[error("Show already exists: {0}")]
    ShowAlreadyExists(ShowId),

    /// Some requested seats do not exist in the show.
    #[error("Seats not found in show {show_id}: {}", join_seats(.seats))]
    SeatNotFound {
        show_id: ShowId,
        seats: Vec<SeatNumber>,
    },

    /// A seat is not in the status the transition requires.
    #[error("Seat {seat} of show {show_id} is {status}")]
    SeatUnavailable {
        show_id: ShowId,
        seat: SeatNumber,
        status: SeatStatus,
    },

    /// The booking does not exist.
    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    /// A compare-and-set on a booking found a different status than expected.
    #[error("Booking {booking_id} is {actual}, expected {expected}")]
    StatusMismatch {
        booking_id: BookingId,
        expected: BookingStatus,
        actual: BookingStatus,
    },

    /// A unique constraint was violated.
    #[error("Duplicate {constraint}")]
    Conflict { constraint: UniqueConstraint },

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

fn join_seats(seats: &[SeatNumber]) -> String {
    seats
        .iter()
        .map(SeatNumber::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
