//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container. Every test works on its own
//! freshly created show, so tests can run in parallel.
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{BookingId, ShowId, UserId};
use domain::{
    Booking, BookingReference, BookingStatus, Money, Payment, PaymentMethod, SeatLayout,
    SeatSelection, SeatStatus,
};
use sqlx::PgPool;
use store::{
    BookingLedger, PostgresBookingLedger, PostgresSeatStore, SeatStore, SeatStoreExt,
    SeatTransition, StoreError, UniqueConstraint,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_booking_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_pool() -> PgPool {
    let info = get_container_info().await;
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap()
}

async fn seat_store_with_show(rows: u32, per_row: u32) -> (PostgresSeatStore, ShowId) {
    let store = PostgresSeatStore::new(get_pool().await);
    let show_id = ShowId::new();
    store
        .create_show(show_id, SeatLayout::new(rows, per_row).unwrap().seat_numbers())
        .await
        .unwrap();
    (store, show_id)
}

fn select(seats: &[&str]) -> SeatSelection {
    SeatSelection::parse(seats.iter().copied()).unwrap()
}

#[tokio::test]
async fn create_show_builds_seat_map() {
    let (store, show_id) = seat_store_with_show(2, 3).await;

    let seats = store.seats(show_id).await.unwrap();
    let labels: Vec<_> = seats.iter().map(|s| s.seat_number.as_str()).collect();
    assert_eq!(labels, vec!["A1", "A2", "A3", "B1", "B2", "B3"]);
    assert!(seats.iter().all(|s| s.status == SeatStatus::Available));

    let inventory = store.inventory(show_id).await.unwrap();
    assert_eq!(inventory.total_seats, 6);
    assert_eq!(inventory.available_seats, 6);

    let err = store
        .create_show(show_id, SeatLayout::new(1, 1).unwrap().seat_numbers())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ShowAlreadyExists(_)));
}

#[tokio::test]
async fn block_confirm_release_keep_counter_exact() {
    let (store, show_id) = seat_store_with_show(1, 5).await;
    let holder = BookingId::new();
    let seats = select(&["A2", "A1"]);

    let blocked = store
        .transition(show_id, &seats, SeatTransition::block(holder))
        .await
        .unwrap();
    assert_eq!(blocked.inventory.available_seats, 3);

    let booked = store
        .transition(show_id, &seats, SeatTransition::confirm(holder))
        .await
        .unwrap();
    assert_eq!(booked.changed.len(), 2);
    assert_eq!(booked.inventory.available_seats, 3);

    let booked_seats = store
        .seats_with_status(show_id, SeatStatus::Booked)
        .await
        .unwrap();
    assert!(booked_seats.iter().all(|s| s.held_by == Some(holder)));

    // Releasing a hold leaves booked seats alone.
    let noop = store
        .transition(show_id, &seats, SeatTransition::release(holder))
        .await
        .unwrap();
    assert!(noop.changed.is_empty());
    assert_eq!(noop.inventory.available_seats, 3);

    let refunded = store
        .transition(show_id, &seats, SeatTransition::release_booked(holder))
        .await
        .unwrap();
    assert_eq!(refunded.inventory.available_seats, 5);
}

#[tokio::test]
async fn block_rolls_back_when_one_seat_is_taken() {
    let (store, show_id) = seat_store_with_show(1, 4).await;
    store
        .transition(show_id, &select(&["A4"]), SeatTransition::block(BookingId::new()))
        .await
        .unwrap();

    let err = store
        .transition(
            show_id,
            &select(&["A1", "A4"]),
            SeatTransition::block(BookingId::new()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SeatUnavailable { ref seat, .. } if seat.as_str() == "A4"));

    let available = store
        .seats_with_status(show_id, SeatStatus::Available)
        .await
        .unwrap();
    assert_eq!(available.len(), 3);
    assert_eq!(store.inventory(show_id).await.unwrap().available_seats, 3);
}

#[tokio::test]
async fn missing_seats_and_shows_are_reported() {
    let (store, show_id) = seat_store_with_show(1, 2).await;

    let err = store
        .transition(
            show_id,
            &select(&["A1", "C9"]),
            SeatTransition::block(BookingId::new()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SeatNotFound { ref seats, .. } if seats.len() == 1));

    let err = store.inventory(ShowId::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::ShowNotFound(_)));
}

#[tokio::test]
async fn concurrent_blocks_sell_each_seat_once() {
    let (store, show_id) = seat_store_with_show(1, 4).await;

    let mut handles = Vec::new();
    for i in 0..12 {
        let store = store.clone();
        // Overlapping selections listed in different orders.
        let seats = if i % 2 == 0 {
            select(&["A1", "A2", "A3"])
        } else {
            select(&["A3", "A2", "A4"])
        };
        handles.push(tokio::spawn(async move {
            store
                .transition(show_id, &seats, SeatTransition::block(BookingId::new()))
                .await
        }));
    }

    let results = futures_util::future::join_all(handles).await;
    let winners = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(winners, 1);

    let inventory = store.inventory(show_id).await.unwrap();
    let available = store
        .seats_with_status(show_id, SeatStatus::Available)
        .await
        .unwrap();
    assert_eq!(inventory.available_seats as usize, available.len());
    assert_eq!(inventory.available_seats, 1);
}

async fn ledger_with_show() -> (PostgresBookingLedger, ShowId) {
    let pool = get_pool().await;
    let show_id = ShowId::new();
    PostgresSeatStore::new(pool.clone())
        .create_show(show_id, SeatLayout::new(1, 5).unwrap().seat_numbers())
        .await
        .unwrap();
    (PostgresBookingLedger::new(pool), show_id)
}

fn pending_booking(show_id: ShowId, user_id: UserId) -> Booking {
    Booking::pending(
        BookingId::new(),
        BookingReference::generate(),
        user_id,
        show_id,
        select(&["A1", "A2"]),
        Money::from_major(250),
    )
}

#[tokio::test]
async fn booking_round_trips_with_payment() {
    let (ledger, show_id) = ledger_with_show().await;
    let booking = pending_booking(show_id, UserId::new());
    ledger.insert(&booking).await.unwrap();

    let mut confirmed = booking.clone();
    let payment = Payment::successful(booking.id(), booking.total_amount(), PaymentMethod::Upi);
    confirmed.confirm(payment.clone()).unwrap();
    ledger
        .update(&confirmed, BookingStatus::Pending)
        .await
        .unwrap();

    let stored = ledger.get(booking.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), BookingStatus::Confirmed);
    assert_eq!(stored.total_amount(), Money::from_major(500));
    assert_eq!(stored.seat_numbers(), booking.seat_numbers());
    let stored_payment = stored.payment().unwrap();
    assert_eq!(stored_payment.transaction_id, payment.transaction_id);
    assert_eq!(stored_payment.method, PaymentMethod::Upi);
    assert_eq!(stored_payment.amount, Money::from_major(500));

    let by_reference = ledger
        .get_by_reference(booking.reference())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_reference.id(), booking.id());
}

#[tokio::test]
async fn duplicate_reference_is_a_conflict() {
    let (ledger, show_id) = ledger_with_show().await;
    let first = pending_booking(show_id, UserId::new());
    ledger.insert(&first).await.unwrap();

    let clash = Booking::pending(
        BookingId::new(),
        first.reference().clone(),
        UserId::new(),
        show_id,
        select(&["A3"]),
        Money::from_major(250),
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
async fn status_update_is_compare_and_set() {
    let (ledger, show_id) = ledger_with_show().await;
    let booking = pending_booking(show_id, UserId::new());
    ledger.insert(&booking).await.unwrap();

    let mut cancelled = booking.clone();
    cancelled.cancel().unwrap();
    ledger
        .update(&cancelled, BookingStatus::Pending)
        .await
        .unwrap();

    let mut confirmed = booking.clone();
    confirmed
        .confirm(Payment::successful(
            booking.id(),
            booking.total_amount(),
            PaymentMethod::Card,
        ))
        .unwrap();
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

    // The losing confirm left no payment behind.
    let stored = ledger.get(booking.id()).await.unwrap().unwrap();
    assert!(stored.payment().is_none());
}

#[tokio::test]
async fn user_bookings_are_newest_first() {
    let (ledger, show_id) = ledger_with_show().await;
    let user_id = UserId::new();

    let older = pending_booking(show_id, user_id);
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let newer = pending_booking(show_id, user_id);
    ledger.insert(&older).await.unwrap();
    ledger.insert(&newer).await.unwrap();

    let listed = ledger.list_for_user(user_id).await.unwrap();
    let ids: Vec<_> = listed.iter().map(Booking::id).collect();
    assert_eq!(ids, vec![newer.id(), older.id()]);

    let cutoff = older.created_at() + chrono::Duration::milliseconds(5);
    let stale = ledger.list_pending_before(cutoff).await.unwrap();
    assert!(stale.iter().any(|b| b.id() == older.id()));
    assert!(stale.iter().all(|b| b.id() != newer.id()));
}
