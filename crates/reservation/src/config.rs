//! Reservation settings loaded from environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What cancelling a confirmed booking does to its seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundPolicy {
    /// Booked seats go back to available.
    #[default]
    ReleaseSeats,
    /// Only the booking's status changes; its seats stay booked.
    RetainSeats,
}

impl std::str::FromStr for RefundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "release" | "release_seats" => Ok(RefundPolicy::ReleaseSeats),
            "retain" | "retain_seats" => Ok(RefundPolicy::RetainSeats),
            other => Err(format!("unknown refund policy: {other}")),
        }
    }
}

/// Reservation settings with sensible defaults.
///
/// Reads from environment variables:
/// - `HOLD_TTL_SECS`: how long a pending booking holds its seats (default: `600`)
/// - `SWEEP_INTERVAL_SECS`: how often expired holds are swept (default: `30`)
/// - `REFUND_POLICY`: `release_seats` or `retain_seats` (default: `release_seats`)
/// - `MAX_REFERENCE_ATTEMPTS`: booking reference draws before giving up (default: `5`)
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    pub hold_ttl: Duration,
    pub sweep_interval: Duration,
    pub refund_policy: RefundPolicy,
    pub max_reference_attempts: u32,
}

impl ReservationConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hold_ttl: env_secs("HOLD_TTL_SECS").unwrap_or(defaults.hold_ttl),
            sweep_interval: env_secs("SWEEP_INTERVAL_SECS").unwrap_or(defaults.sweep_interval),
            refund_policy: std::env::var("REFUND_POLICY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.refund_policy),
            max_reference_attempts: std::env::var("MAX_REFERENCE_ATTEMPTS")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_reference_attempts),
        }
    }

    /// Returns the hold TTL as a `chrono` duration for timestamp arithmetic.
    pub fn hold_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.hold_ttl).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(30),
            refund_policy: RefundPolicy::ReleaseSeats,
            max_reference_attempts: 5,
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
