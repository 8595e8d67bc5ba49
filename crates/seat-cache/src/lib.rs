//! Read side of the seat reservation system.
//!
//! This crate provides:
//! - [`SeatCache`]: lazily populated seat maps and show inventory
//! - [`CacheListener`]: evicts cache entries as invalidations arrive from
//!   the reservation engine

pub mod cache;
pub mod listener;

pub use cache::SeatCache;
pub use listener::CacheListener;
