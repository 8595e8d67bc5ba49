//! Booking state machine.

use serde::{Deserialize, Serialize};

/// The status of a booking in its lifecycle.
///
/// State transitions:
/// ```text
/// ∅ ──► Pending ──┬──► Confirmed ──► Cancelled
///                 ├──► Cancelled
///                 └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Seats are blocked, awaiting payment.
    #[default]
    Pending,

    /// Payment succeeded and seats are booked.
    Confirmed,

    /// Cancelled by the user, by hold expiry or by a refund (terminal state).
    Cancelled,

    /// Seat confirmation failed (terminal state).
    Failed,
}

impl BookingStatus {
    /// Returns true if the booking can be confirmed in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if the booking can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Returns true if the booking can be marked failed in this state.
    pub fn can_fail(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if the booking still holds its seats.
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Failed)
    }

    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        match next {
            BookingStatus::Pending => false,
            BookingStatus::Confirmed => self.can_confirm(),
            BookingStatus::Cancelled => self.can_cancel(),
            BookingStatus::Failed => self.can_fail(),
        }
    }

    /// Returns the state name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "FAILED" => Ok(BookingStatus::Failed),
            other => Err(format!("unknown booking status {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Failed,
    ];

    #[test]
    fn test_default_state_is_pending() {
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
    }

    #[test]
    fn test_only_legal_transitions_are_allowed() {
        let legal = [
            (BookingStatus::Pending, BookingStatus::Confirmed),
            (BookingStatus::Pending, BookingStatus::Cancelled),
            (BookingStatus::Pending, BookingStatus::Failed),
            (BookingStatus::Confirmed, BookingStatus::Cancelled),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Failed.is_terminal());
    }

    #[test]
    fn test_holds_seats() {
        assert!(BookingStatus::Pending.holds_seats());
        assert!(BookingStatus::Confirmed.holds_seats());
        assert!(!BookingStatus::Cancelled.holds_seats());
        assert!(!BookingStatus::Failed.holds_seats());
    }

    #[test]
    fn test_str_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&BookingStatus::Confirmed).unwrap(),
            "\"CONFIRMED\""
        );
    }
}
