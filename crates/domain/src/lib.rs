//! Domain layer for the seat reservation system.
//!
//! This crate provides the core domain types including:
//! - Seats, seat statuses and validated seat selections
//! - Show inventory counters and seat map generation
//! - The booking state machine and booking references
//! - Payment records and money amounts

pub mod booking;
pub mod error;
pub mod money;
pub mod payment;
pub mod seat;
pub mod show;

pub use booking::{Booking, BookingError, BookingParts, BookingReference, BookingStatus};
pub use common::{BookingId, PaymentId, ShowId, UserId};
pub use error::DomainError;
pub use money::Money;
pub use payment::{Payment, PaymentMethod, PaymentStatus, TransactionId};
pub use seat::{Seat, SeatNumber, SeatSelection, SeatStatus};
pub use show::{SeatLayout, ShowDetails, ShowInventory};
