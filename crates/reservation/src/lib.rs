//! Seat reservation engine and booking orchestration.
//!
//! This crate provides:
//! - [`ReservationEngine`]: atomic block/confirm/release of seat sets with
//!   per-seat locking and an exact available-seat counter
//! - [`BookingOrchestrator`]: the booking lifecycle with compensation when
//!   seats and the ledger disagree
//! - [`HoldSweeper`]: background expiry of pending bookings
//! - cache invalidation hooks fired after every committed seat change

pub mod catalog;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod invalidation;
pub mod orchestrator;

pub use catalog::{Catalog, InMemoryCatalog};
pub use commands::{CancelBooking, ConfirmBooking, CreateBooking};
pub use config::{RefundPolicy, ReservationConfig};
pub use engine::ReservationEngine;
pub use error::{ErrorKind, ReservationError, Result};
pub use expiry::HoldSweeper;
pub use invalidation::{
    BroadcastInvalidator, CacheScope, Invalidation, InvalidationSignal, NoopInvalidator,
};
pub use orchestrator::{BookingOrchestrator, ReferenceGenerator};
