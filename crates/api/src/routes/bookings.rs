//! Booking lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{BookingId, ShowId, UserId};
use domain::{Booking, Payment};
use reservation::{CancelBooking, Catalog, ConfirmBooking, CreateBooking};
use serde::{Deserialize, Serialize};
use store::{BookingLedger, SeatStore};

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub show_id: String,
    pub seat_numbers: Vec<String>,
}

#[derive(Deserialize)]
pub struct ConfirmBookingRequest {
    pub payment_method: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub reference: String,
    pub user_id: String,
    pub show_id: String,
    pub seat_numbers: Vec<String>,
    pub number_of_seats: usize,
    pub total_amount_minor: i64,
    pub status: String,
    pub payment: Option<PaymentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub amount_minor: i64,
    pub method: String,
    pub status: String,
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            amount_minor: payment.amount.minor(),
            method: payment.method.to_string(),
            status: payment.status.as_str().to_string(),
            transaction_id: payment.transaction_id.as_str().to_string(),
            paid_at: payment.paid_at,
        }
    }
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id().to_string(),
            reference: booking.reference().to_string(),
            user_id: booking.user_id().to_string(),
            show_id: booking.show_id().to_string(),
            seat_numbers: booking
                .seat_numbers()
                .iter()
                .map(|seat| seat.to_string())
                .collect(),
            number_of_seats: booking.number_of_seats(),
            total_amount_minor: booking.total_amount().minor(),
            status: booking.status().to_string(),
            payment: booking.payment().map(PaymentResponse::from),
            created_at: booking.created_at(),
            updated_at: booking.updated_at(),
        }
    }
}

// -- Handlers --

/// POST /bookings: hold seats and record a pending booking.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let user_id: UserId = parse_id("user", &req.user_id)?;
    let show_id: ShowId = parse_id("show", &req.show_id)?;

    let booking = state
        .orchestrator
        .create_booking(CreateBooking::new(user_id, show_id, req.seat_numbers))
        .await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// GET /bookings/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let booking_id: BookingId = parse_id("booking", &id)?;
    let booking = state.orchestrator.get_booking(booking_id).await?;
    Ok(Json(booking.into()))
}

/// GET /bookings/reference/{reference}
#[tracing::instrument(skip(state))]
pub async fn get_by_reference<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(reference): Path<String>,
) -> Result<Json<BookingResponse>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let booking = state
        .orchestrator
        .get_booking_by_reference(&reference)
        .await?;
    Ok(Json(booking.into()))
}

/// GET /users/{id}/bookings: newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<BookingResponse>>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let user_id: UserId = parse_id("user", &id)?;
    let bookings = state.orchestrator.list_user_bookings(user_id).await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// POST /bookings/{id}/confirm: pay and book the held seats.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
    Json(req): Json<ConfirmBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let booking_id: BookingId = parse_id("booking", &id)?;
    let booking = state
        .orchestrator
        .confirm_booking(ConfirmBooking::new(booking_id, req.payment_method))
        .await?;
    Ok(Json(booking.into()))
}

/// POST /bookings/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let booking_id: BookingId = parse_id("booking", &id)?;
    let booking = state
        .orchestrator
        .cancel_booking(CancelBooking::new(booking_id))
        .await?;
    Ok(Json(booking.into()))
}
