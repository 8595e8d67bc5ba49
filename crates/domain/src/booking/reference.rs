//! Human-facing booking references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PREFIX: &str = "BMS";
const RANDOM_LEN: usize = 8;

/// Externally shown booking identifier, e.g. `BMS1A2B3C4D`.
///
/// References are drawn at random; uniqueness is enforced by the ledger and a
/// collision is resolved by drawing again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingReference(String);

impl BookingReference {
    /// Draws a new random reference.
    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self(format!("{PREFIX}{}", &random[..RANDOM_LEN]))
    }

    /// Wraps an existing reference, e.g. one read back from storage or a URL.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
