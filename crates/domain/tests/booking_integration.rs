//! Booking lifecycle through the public domain API.

use chrono::{Duration, Utc};
use domain::{
    Booking, BookingError, BookingId, BookingReference, BookingStatus, Money, Payment,
    PaymentMethod, SeatLayout, SeatSelection, ShowId, UserId,
};

fn pending_booking(seats: &[&str]) -> Booking {
    Booking::pending(
        BookingId::new(),
        BookingReference::generate(),
        UserId::new(),
        ShowId::new(),
        SeatSelection::parse(seats).unwrap(),
        Money::from_major(250),
    )
}

#[test]
fn test_pay_then_refund() {
    let mut booking = pending_booking(&["C4", "C5"]);
    assert_eq!(booking.total_amount(), Money::from_major(500));
    assert!(booking.status().holds_seats());

    let payment = Payment::successful(booking.id(), booking.total_amount(), PaymentMethod::Card);
    booking.confirm(payment).unwrap();
    assert_eq!(booking.status(), BookingStatus::Confirmed);
    assert_eq!(
        booking.payment().unwrap().transaction_id.as_str().len(),
        "TXN".len() + 12
    );

    let previous = booking.cancel().unwrap();
    assert_eq!(previous, BookingStatus::Confirmed);
    assert!(booking.status().is_terminal());
    assert!(!booking.status().holds_seats());
}

#[test]
fn test_payment_must_match_booking() {
    let mut booking = pending_booking(&["A1"]);

    let short = Payment::successful(booking.id(), Money::from_major(1), PaymentMethod::Upi);
    assert!(matches!(
        booking.confirm(short),
        Err(BookingError::PaymentAmountMismatch { .. })
    ));

    let foreign = Payment::successful(BookingId::new(), booking.total_amount(), PaymentMethod::Upi);
    assert!(matches!(
        booking.confirm(foreign),
        Err(BookingError::PaymentBookingMismatch)
    ));
    assert_eq!(booking.status(), BookingStatus::Pending);
}

#[test]
fn test_hold_expiry_window() {
    let booking = pending_booking(&["B2"]);
    let ttl = Duration::minutes(10);

    assert!(!booking.hold_expired(booking.created_at() + Duration::minutes(9), ttl));
    assert!(booking.hold_expired(booking.created_at() + ttl, ttl));
    assert!(!booking.hold_expired(Utc::now() - Duration::minutes(1), ttl));
}

#[test]
fn test_layout_seats_are_bookable() {
    let layout = SeatLayout::new(3, 4).unwrap();
    let labels: Vec<String> = layout
        .seat_numbers()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(labels.len(), 12);
    assert_eq!(labels.first().map(String::as_str), Some("A1"));
    assert_eq!(labels.last().map(String::as_str), Some("C4"));

    let selection = SeatSelection::parse(&labels).unwrap();
    assert_eq!(selection.len(), 12);
}

#[test]
fn test_booking_survives_json() {
    let mut booking = pending_booking(&["D1", "D2", "D3"]);
    let payment = Payment::successful(booking.id(), booking.total_amount(), PaymentMethod::Wallet);
    booking.confirm(payment).unwrap();

    let json = serde_json::to_string(&booking).unwrap();
    let back: Booking = serde_json::from_str(&json).unwrap();
    assert_eq!(back, booking);
}
