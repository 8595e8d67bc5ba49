//! HTTP route handlers.

pub mod bookings;
pub mod health;
pub mod metrics;
pub mod seats;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a UUID path segment into a typed identifier.
fn parse_id<T>(what: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what} id: {e}")))
}
