//! Seats and seat selections.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{BookingId, ShowId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_SEAT_NUMBER_LEN: usize = 16;

/// A seat label within a show's seat map, e.g. `A1` or `B12`.
///
/// Ordering is lexicographic on the label. That ordering is the lock order
/// used whenever several seats of one show are locked together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatNumber(String);

impl SeatNumber {
    /// Parses a seat label, trimming surrounding whitespace.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_SEAT_NUMBER_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(DomainError::InvalidSeatNumber(raw.as_ref().to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Wraps a label generated by a `SeatLayout`, which is valid by construction.
    pub(crate) fn from_layout(label: String) -> Self {
        Self(label)
    }

    /// Returns the seat label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SeatNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SeatNumber> for String {
    fn from(seat: SeatNumber) -> Self {
        seat.0
    }
}

impl AsRef<str> for SeatNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The status of a single seat.
///
/// State transitions:
/// ```text
/// Available ──► Blocked ──► Booked
///     ▲            │           │
///     └────────────┴───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    /// Free to be blocked by any booking.
    #[default]
    Available,

    /// Temporarily held by a pending booking.
    Blocked,

    /// Sold to a confirmed booking.
    Booked,
}

impl SeatStatus {
    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Blocked => "BLOCKED",
            SeatStatus::Booked => "BOOKED",
        }
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SeatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(SeatStatus::Available),
            "BLOCKED" => Ok(SeatStatus::Blocked),
            "BOOKED" => Ok(SeatStatus::Booked),
            other => Err(format!("unknown seat status {other:?}")),
        }
    }
}

/// A seat of one show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub show_id: ShowId,
    pub seat_number: SeatNumber,
    pub status: SeatStatus,
    /// Booking holding the seat while it is blocked or booked.
    pub held_by: Option<BookingId>,
    pub last_modified: DateTime<Utc>,
}

impl Seat {
    /// Creates an available seat.
    pub fn available(show_id: ShowId, seat_number: SeatNumber) -> Self {
        Self {
            show_id,
            seat_number,
            status: SeatStatus::Available,
            held_by: None,
            last_modified: Utc::now(),
        }
    }

    /// Returns true if the seat is available.
    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    /// Returns true if the seat is in `status` and held by `holder`.
    pub fn is_held_by(&self, status: SeatStatus, holder: BookingId) -> bool {
        self.status == status && self.held_by == Some(holder)
    }
}

/// A validated, non-empty list of distinct seat numbers in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SeatNumber>", into = "Vec<SeatNumber>")]
pub struct SeatSelection(Vec<SeatNumber>);

impl SeatSelection {
    /// Validates a list of seats.
    ///
    /// Rejects empty lists and lists naming a seat twice.
    pub fn new(seats: Vec<SeatNumber>) -> Result<Self, DomainError> {
        if seats.is_empty() {
            return Err(DomainError::EmptySeatSelection);
        }
        let mut seen = HashSet::with_capacity(seats.len());
        for seat in &seats {
            if !seen.insert(seat) {
                return Err(DomainError::DuplicateSeat(seat.clone()));
            }
        }
        Ok(Self(seats))
    }

    /// Parses and validates raw seat labels.
    pub fn parse<I, S>(raw: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seats = raw
            .into_iter()
            .map(SeatNumber::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(seats)
    }

    /// Returns the seats in request order.
    pub fn seats(&self) -> &[SeatNumber] {
        &self.0
    }

    /// Returns the seats in lock order.
    pub fn lock_order(&self) -> Vec<&SeatNumber> {
        let mut ordered: Vec<&SeatNumber> = self.0.iter().collect();
        ordered.sort();
        ordered
    }

    /// Returns the number of seats.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for the `len`/`is_empty` pair.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the selection names `seat`.
    pub fn contains(&self, seat: &SeatNumber) -> bool {
        self.0.contains(seat)
    }
}

impl TryFrom<Vec<SeatNumber>> for SeatSelection {
    type Error = DomainError;

    fn try_from(value: Vec<SeatNumber>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SeatSelection> for Vec<SeatNumber> {
    fn from(selection: SeatSelection) -> Self {
        selection.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_number_trims_and_validates() {
        assert_eq!(SeatNumber::parse(" A1 ").unwrap().as_str(), "A1");
        assert!(SeatNumber::parse("").is_err());
        assert!(SeatNumber::parse("   ").is_err());
        assert!(SeatNumber::parse("A-1").is_err());
        assert!(SeatNumber::parse("A1234567890123456").is_err());
    }

    #[test]
    fn test_seat_number_rejects_invalid_json() {
        assert!(serde_json::from_str::<SeatNumber>("\"B7\"").is_ok());
        assert!(serde_json::from_str::<SeatNumber>("\"\"").is_err());
    }

    #[test]
    fn test_seat_status_round_trips_through_str() {
        for status in [SeatStatus::Available, SeatStatus::Blocked, SeatStatus::Booked] {
            assert_eq!(status.as_str().parse::<SeatStatus>().unwrap(), status);
        }
        assert!("SOLD".parse::<SeatStatus>().is_err());
    }

    #[test]
    fn test_selection_rejects_empty() {
        let empty: Vec<&str> = vec![];
        assert_eq!(
            SeatSelection::parse(empty).unwrap_err(),
            DomainError::EmptySeatSelection
        );
    }

    #[test]
    fn test_selection_rejects_duplicates() {
        let err = SeatSelection::parse(["A1", "A2", "A1"]).unwrap_err();
        assert_eq!(
            err,
            DomainError::DuplicateSeat(SeatNumber::parse("A1").unwrap())
        );
    }

    #[test]
    fn test_selection_keeps_request_order_and_sorts_for_locking() {
        let selection = SeatSelection::parse(["C3", "A1", "B2"]).unwrap();
        let requested: Vec<&str> = selection.seats().iter().map(|s| s.as_str()).collect();
        assert_eq!(requested, vec!["C3", "A1", "B2"]);

        let locked: Vec<&str> = selection.lock_order().iter().map(|s| s.as_str()).collect();
        assert_eq!(locked, vec!["A1", "B2", "C3"]);
    }

    #[test]
    fn test_seat_held_by() {
        let booking = BookingId::new();
        let mut seat = Seat::available(ShowId::new(), SeatNumber::parse("A1").unwrap());
        assert!(seat.is_available());
        assert!(!seat.is_held_by(SeatStatus::Blocked, booking));

        seat.status = SeatStatus::Blocked;
        seat.held_by = Some(booking);
        assert!(seat.is_held_by(SeatStatus::Blocked, booking));
        assert!(!seat.is_held_by(SeatStatus::Booked, booking));
        assert!(!seat.is_held_by(SeatStatus::Blocked, BookingId::new()));
    }
}
