//! Payment records.

use chrono::{DateTime, Utc};
use common::{BookingId, PaymentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::money::Money;

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Upi,
    NetBanking,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::NetBanking => "NET_BANKING",
            PaymentMethod::Wallet => "WALLET",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = DomainError;

    /// Parses a method name case-insensitively (`card`, `Upi`, `net_banking`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CARD" => Ok(PaymentMethod::Card),
            "UPI" => Ok(PaymentMethod::Upi),
            "NET_BANKING" => Ok(PaymentMethod::NetBanking),
            "WALLET" => Ok(PaymentMethod::Wallet),
            _ => Err(DomainError::UnsupportedPaymentMethod(s.to_string())),
        }
    }
}

/// Status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status {other:?}")),
        }
    }
}

/// Unique transaction identifier, e.g. `TXN0A1B2C3D4E5F`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Draws a new random transaction id.
    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self(format!("TXN{}", &random[..12]))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A payment owned by exactly one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: TransactionId,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    /// Records a successful payment with a freshly drawn transaction id.
    pub fn successful(booking_id: BookingId, amount: Money, method: PaymentMethod) -> Self {
        Self {
            id: PaymentId::new(),
            booking_id,
            amount,
            method,
            status: PaymentStatus::Success,
            transaction_id: TransactionId::generate(),
            paid_at: Utc::now(),
        }
    }

    /// Replaces the transaction id after a uniqueness collision.
    pub fn redraw_transaction_id(&mut self) {
        self.transaction_id = TransactionId::generate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!(
            "net_banking".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::NetBanking
        );
        assert_eq!(
            "bitcoin".parse::<PaymentMethod>().unwrap_err(),
            DomainError::UnsupportedPaymentMethod("bitcoin".to_string())
        );
    }

    #[test]
    fn test_successful_payment() {
        let booking_id = BookingId::new();
        let payment = Payment::successful(booking_id, Money::from_major(500), PaymentMethod::Card);
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.booking_id, booking_id);
        assert!(payment.transaction_id.as_str().starts_with("TXN"));
        assert_eq!(payment.transaction_id.as_str().len(), 15);
    }

    #[test]
    fn test_redraw_transaction_id() {
        let mut payment =
            Payment::successful(BookingId::new(), Money::from_major(1), PaymentMethod::Wallet);
        let before = payment.transaction_id.clone();
        payment.redraw_transaction_id();
        assert_ne!(payment.transaction_id, before);
    }
}
