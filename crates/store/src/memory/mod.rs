//! In-memory backends.

mod ledger;
mod seats;

pub use ledger::InMemoryBookingLedger;
pub use seats::InMemorySeatStore;
