//! Caller-facing error taxonomy for the engine and the orchestrator.

use common::{BookingId, ShowId};
use domain::{BookingStatus, DomainError, SeatNumber};
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// Coarse error category, stable across storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    SeatUnavailable,
    InvalidState,
    InvalidRequest,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::SeatUnavailable => "SEAT_UNAVAILABLE",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors returned by reservation and booking operations.
///
/// Storage faults never leak their detail: they are logged where they are
/// converted and surface as [`ReservationError::Internal`].
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("Show not found: {0}")]
    ShowNotFound(ShowId),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Seats not found in show {show_id}: {}", join_seats(.seats))]
    SeatNotFound {
        show_id: ShowId,
        seats: Vec<SeatNumber>,
    },

    /// The first seat (in lock order) that could not be taken.
    #[error("Seat {seat} is not available")]
    SeatUnavailable { seat: SeatNumber },

    #[error("Cannot {action} booking {booking_id} in {status} state")]
    InvalidState {
        booking_id: BookingId,
        status: BookingStatus,
        action: &'static str,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReservationError {
    /// Returns the error's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::ShowNotFound(_)
            | ReservationError::BookingNotFound(_)
            | ReservationError::SeatNotFound { .. } => ErrorKind::NotFound,
            ReservationError::SeatUnavailable { .. } => ErrorKind::SeatUnavailable,
            ReservationError::InvalidState { .. } => ErrorKind::InvalidState,
            ReservationError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ReservationError::Conflict(_) => ErrorKind::Conflict,
            ReservationError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ShowNotFound(show_id) => ReservationError::ShowNotFound(show_id),
            StoreError::ShowAlreadyExists(show_id) => {
                ReservationError::Conflict(format!("show {show_id} already has a seat map"))
            }
            StoreError::SeatNotFound { show_id, seats } => {
                ReservationError::SeatNotFound { show_id, seats }
            }
            StoreError::SeatUnavailable { seat, .. } => ReservationError::SeatUnavailable { seat },
            StoreError::BookingNotFound(booking_id) => {
                ReservationError::BookingNotFound(booking_id.to_string())
            }
            StoreError::StatusMismatch {
                booking_id, actual, ..
            } => ReservationError::InvalidState {
                booking_id,
                status: actual,
                action: "update",
            },
            StoreError::Conflict { constraint } => {
                ReservationError::Conflict(format!("duplicate {constraint}"))
            }
            err @ (StoreError::Unavailable(_)
            | StoreError::Corrupt(_)
            | StoreError::Database(_)) => {
                tracing::error!(error = %err, "storage failure");
                ReservationError::Internal("storage failure".to_string())
            }
        }
    }
}

impl From<DomainError> for ReservationError {
    fn from(err: DomainError) -> Self {
        ReservationError::InvalidRequest(err.to_string())
    }
}

/// Convenience type alias for reservation results.
pub type Result<T> = std::result::Result<T, ReservationError>;

fn join_seats(seats: &[SeatNumber]) -> String {
    seats
        .iter()
        .map(SeatNumber::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
