//! Booking aggregate and related types.

mod aggregate;
mod reference;
mod state;

pub use aggregate::{Booking, BookingParts};
pub use reference::BookingReference;
pub use state::BookingStatus;

use thiserror::Error;

use crate::money::Money;

/// Errors that can occur during booking state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Booking is not in a state that permits the action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: BookingStatus,
        action: &'static str,
    },

    /// The payment does not cover exactly the booking's total.
    #[error("Payment amount {actual} does not match booking total {expected}")]
    PaymentAmountMismatch { expected: Money, actual: Money },

    /// The payment belongs to another booking.
    #[error("Payment belongs to a different booking")]
    PaymentBookingMismatch,
}
