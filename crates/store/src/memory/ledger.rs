use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, UserId};
use domain::{Booking, BookingReference, BookingStatus, TransactionId};
use tokio::sync::RwLock;

use crate::ledger::BookingLedger;
use crate::{Result, StoreError, UniqueConstraint};

#[derive(Debug, Default)]
struct LedgerState {
    bookings: HashMap<BookingId, Booking>,
    by_reference: HashMap<BookingReference, BookingId>,
    transaction_ids: HashSet<TransactionId>,
}

/// In-memory booking ledger for tests and local runs.
///
/// Enforces the same unique constraints as the PostgreSQL schema.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingLedger {
    state: Arc<RwLock<LedgerState>>,
    fail_on_insert: Arc<AtomicBool>,
    fail_on_update: Arc<AtomicBool>,
}

impl InMemoryBookingLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the ledger to fail every insert with `Unavailable`.
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.fail_on_insert.store(fail, Ordering::SeqCst);
    }

    /// Configures the ledger to fail every update with `Unavailable`.
    pub fn set_fail_on_update(&self, fail: bool) {
        self.fail_on_update.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored bookings.
    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }
}

#[async_trait]
impl BookingLedger for InMemoryBookingLedger {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        if self.fail_on_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("ledger rejected insert".to_string()));
        }

        let mut state = self.state.write().await;
        if state.bookings.contains_key(&booking.id()) {
            return Err(StoreError::Conflict {
                constraint: UniqueConstraint::BookingId,
            });
        }
        if state.by_reference.contains_key(booking.reference()) {
            return Err(StoreError::Conflict {
                constraint: UniqueConstraint::BookingReference,
            });
        }

        state
            .by_reference
            .insert(booking.reference().clone(), booking.id());
        state.bookings.insert(booking.id(), booking.clone());
        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&booking_id).cloned())
    }

    async fn get_by_reference(&self, reference: &BookingReference) -> Result<Option<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .by_reference
            .get(reference)
            .and_then(|id| state.bookings.get(id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id() == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(bookings)
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let state = self.state.read().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.status() == BookingStatus::Pending && b.created_at() < cutoff)
            .cloned()
            .collect();
        bookings.sort_by_key(Booking::created_at);
        Ok(bookings)
    }

    async fn update(&self, booking: &Booking, expected: BookingStatus) -> Result<()> {
        if self.fail_on_update.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("ledger rejected update".to_string()));
        }

        let mut state = self.state.write().await;
        let actual = state
            .bookings
            .get(&booking.id())
            .map(Booking::status)
            .ok_or(StoreError::BookingNotFound(booking.id()))?;
        if actual != expected {
            return Err(StoreError::StatusMismatch {
                booking_id: booking.id(),
                expected,
                actual,
            });
        }

        let confirming =
            expected != BookingStatus::Confirmed && booking.status() == BookingStatus::Confirmed;
        if confirming
            && let Some(payment) = booking.payment()
            && !state.transaction_ids.insert(payment.transaction_id.clone())
        {
            return Err(StoreError::Conflict {
                constraint: UniqueConstraint::TransactionId,
            });
        }

        state.bookings.insert(booking.id(), booking.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ShowId;
    use domain::{Money, Payment, PaymentMethod, SeatSelection};

    fn pending(user_id: UserId) -> Booking {
        Booking::pending(
            BookingId::new(),
            BookingReference::generate(),
            user_id,
            ShowId::new(),
            SeatSelection::parse(["A1"]).unwrap(),
            Money::from_major(100),
        )
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let ledger = InMemoryBookingLedger::new();
        let booking = pending(UserId::new());
        ledger.insert(&booking).await.unwrap();

        assert_eq!(ledger.get(booking.id()).await.unwrap(), Some(booking.clone()));
        assert_eq!(
            ledger.get_by_reference(booking.reference()).await.unwrap(),
            Some(booking.clone())
        );
        assert_eq!(ledger.get(BookingId::new()).await.unwrap(), None);
        assert_eq!(ledger.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_reference_conflicts() {
        let ledger = InMemoryBookingLedger::new();
        let first = pending(UserId::new());
        ledger.insert(&first).await.unwrap();

        let clash = Booking::pending(
            BookingId::new(),
            first.reference().clone(),
            UserId::new(),
            ShowId::new(),
            SeatSelection::parse(["B1"]).unwrap(),
            Money::from_major(100),
        );
        let err = ledger.insert(&clash).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                constraint: UniqueConstraint::BookingReference
            }
        ));
    }

    #[tokio::test]
    async fn test_update_is_compare_and_set() {
        let ledger = InMemoryBookingLedger::new();
        let booking = pending(UserId::new());
        ledger.insert(&booking).await.unwrap();

        let mut cancelled = booking.clone();
        cancelled.cancel().unwrap();
        ledger
            .update(&cancelled, BookingStatus::Pending)
            .await
            .unwrap();

        let mut confirmed = booking.clone();
        let payment =
            Payment::successful(booking.id(), booking.total_amount(), PaymentMethod::Card);
        confirmed.confirm(payment).unwrap();
        let err = ledger
            .update(&confirmed, BookingStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StatusMismatch {
                actual: BookingStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(
            ledger.get(booking.id()).await.unwrap().unwrap().status(),
            BookingStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_transaction_ids_are_unique() {
        let ledger = InMemoryBookingLedger::new();
        let first = pending(UserId::new());
        let second = pending(UserId::new());
        ledger.insert(&first).await.unwrap();
        ledger.insert(&second).await.unwrap();

        let payment = Payment::successful(first.id(), first.total_amount(), PaymentMethod::Upi);
        let mut confirmed = first.clone();
        confirmed.confirm(payment.clone()).unwrap();
        ledger
            .update(&confirmed, BookingStatus::Pending)
            .await
            .unwrap();

        let mut reused = payment;
        reused.booking_id = second.id();
        let mut clash = second.clone();
        clash.confirm(reused).unwrap();
        let err = ledger
            .update(&clash, BookingStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                constraint: UniqueConstraint::TransactionId
            }
        ));
    }

    #[tokio::test]
    async fn test_user_listing_is_newest_first() {
        let ledger = InMemoryBookingLedger::new();
        let user_id = UserId::new();
        let older = pending(user_id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = pending(user_id);
        ledger.insert(&older).await.unwrap();
        ledger.insert(&newer).await.unwrap();
        ledger.insert(&pending(UserId::new())).await.unwrap();

        let ids: Vec<_> = ledger
            .list_for_user(user_id)
            .await
            .unwrap()
            .iter()
            .map(Booking::id)
            .collect();
        assert_eq!(ids, vec![newer.id(), older.id()]);
    }

    #[tokio::test]
    async fn test_pending_before_cutoff() {
        let ledger = InMemoryBookingLedger::new();
        let stale = pending(UserId::new());
        ledger.insert(&stale).await.unwrap();

        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        let found = ledger.list_pending_before(cutoff).await.unwrap();
        assert_eq!(found.len(), 1);

        let earlier = stale.created_at() - chrono::Duration::seconds(1);
        assert!(ledger.list_pending_before(earlier).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_on_insert() {
        let ledger = InMemoryBookingLedger::new();
        ledger.set_fail_on_insert(true);
        let err = ledger.insert(&pending(UserId::new())).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(ledger.booking_count().await, 0);
    }
}
