//! Liveness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use reservation::Catalog;
use serde::Serialize;
use store::{BookingLedger, SeatStore};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cached_entries: usize,
}

/// GET /health: the process is up and the read cache is reachable.
pub async fn check<S, L, C>(State(state): State<Arc<AppState<S, L, C>>>) -> Json<HealthResponse>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cached_entries: state.cache.len().await,
    })
}
