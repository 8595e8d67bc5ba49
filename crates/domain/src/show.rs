//! Show inventory and seat map layout.

use common::ShowId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::seat::SeatNumber;

/// Per-show seat counters.
///
/// `available_seats` always equals the number of the show's seats whose
/// status is `AVAILABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowInventory {
    pub show_id: ShowId,
    pub total_seats: u32,
    pub available_seats: u32,
}

impl ShowInventory {
    /// Creates the inventory of a freshly created show: every seat available.
    pub fn new(show_id: ShowId, total_seats: u32) -> Self {
        Self {
            show_id,
            total_seats,
            available_seats: total_seats,
        }
    }

    /// Number of seats currently blocked or booked.
    pub fn occupied_seats(&self) -> u32 {
        self.total_seats - self.available_seats
    }

    /// Returns true if no seat is available.
    pub fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }
}

/// The catalog's view of a show, as needed to price a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowDetails {
    pub id: ShowId,
    pub price: Money,
    pub total_seats: u32,
}

/// A rectangular theater layout: rows lettered from `A`, seats numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLayout {
    rows: u32,
    seats_per_row: u32,
}

impl SeatLayout {
    /// Creates a layout. At most 26 rows, one per letter.
    pub fn new(rows: u32, seats_per_row: u32) -> Result<Self, DomainError> {
        if rows == 0 || rows > 26 || seats_per_row == 0 {
            return Err(DomainError::InvalidLayout {
                rows,
                seats_per_row,
            });
        }
        Ok(Self {
            rows,
            seats_per_row,
        })
    }

    /// Total number of seats in the layout.
    pub fn total_seats(&self) -> u32 {
        self.rows * self.seats_per_row
    }

    /// Generates the seat labels row by row: `A1, A2, …, B1, …`.
    pub fn seat_numbers(&self) -> Vec<SeatNumber> {
        let mut seats = Vec::with_capacity(self.total_seats() as usize);
        for letter in ('A'..='Z').take(self.rows as usize) {
            for number in 1..=self.seats_per_row {
                seats.push(SeatNumber::from_layout(format!("{letter}{number}")));
            }
        }
        seats
    }
}
