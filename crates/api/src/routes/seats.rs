//! Seat map and inventory endpoints, served from the read cache.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ShowId;
use domain::{Seat, ShowInventory};
use reservation::Catalog;
use serde::Serialize;
use store::{BookingLedger, SeatStore};

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct SeatResponse {
    pub seat_number: String,
    pub status: String,
}

impl From<Seat> for SeatResponse {
    fn from(seat: Seat) -> Self {
        Self {
            seat_number: seat.seat_number.to_string(),
            status: seat.status.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct InventoryResponse {
    pub show_id: String,
    pub total_seats: u32,
    pub available_seats: u32,
    pub sold_out: bool,
}

impl From<ShowInventory> for InventoryResponse {
    fn from(inventory: ShowInventory) -> Self {
        Self {
            show_id: inventory.show_id.to_string(),
            total_seats: inventory.total_seats,
            available_seats: inventory.available_seats,
            sold_out: inventory.is_sold_out(),
        }
    }
}

/// GET /shows/{id}/seats: every seat, ordered by seat number.
#[tracing::instrument(skip(state))]
pub async fn list<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SeatResponse>>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let show_id: ShowId = parse_id("show", &id)?;
    let seats = state.cache.seats(show_id).await?;
    Ok(Json(seats.into_iter().map(SeatResponse::from).collect()))
}

/// GET /shows/{id}/seats/available
#[tracing::instrument(skip(state))]
pub async fn available<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SeatResponse>>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let show_id: ShowId = parse_id("show", &id)?;
    let seats = state.cache.available_seats(show_id).await?;
    Ok(Json(seats.into_iter().map(SeatResponse::from).collect()))
}

/// GET /shows/{id}/inventory
#[tracing::instrument(skip(state))]
pub async fn inventory<S, L, C>(
    State(state): State<Arc<AppState<S, L, C>>>,
    Path(id): Path<String>,
) -> Result<Json<InventoryResponse>, ApiError>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let show_id: ShowId = parse_id("show", &id)?;
    let inventory = state.cache.inventory(show_id).await?;
    Ok(Json(inventory.into()))
}
