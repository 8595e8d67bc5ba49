//! Storage for seats, show inventory, bookings and payments.
//!
//! Two backends implement the same traits:
//! - [`memory`]: per-seat row locks in process, used by tests and local runs
//! - [`postgres`]: `SELECT … FOR UPDATE` row locks inside a transaction

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod seats;

pub use error::{Result, StoreError, UniqueConstraint};
pub use ledger::BookingLedger;
pub use memory::{InMemoryBookingLedger, InMemorySeatStore};
pub use postgres::{PostgresBookingLedger, PostgresSeatStore, run_migrations};
pub use seats::{SeatStore, SeatStoreExt, SeatTransition, TransitionMode, TransitionOutcome};
