//! HTTP API server with observability for the seat reservation system.
//!
//! Provides REST endpoints for the booking lifecycle and seat map queries,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation::{
    BookingOrchestrator, BroadcastInvalidator, Catalog, ReservationConfig, ReservationEngine,
};
use seat_cache::{CacheListener, SeatCache};
use store::{BookingLedger, SeatStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, L, C>
where
    S: SeatStore,
    L: BookingLedger,
    C: Catalog,
{
    pub orchestrator: Arc<BookingOrchestrator<S, L, C>>,
    pub cache: SeatCache<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, L, C>(
    state: Arc<AppState<S, L, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, L, C>))
        .route("/bookings", post(routes::bookings::create::<S, L, C>))
        .route("/bookings/{id}", get(routes::bookings::get::<S, L, C>))
        .route(
            "/bookings/reference/{reference}",
            get(routes::bookings::get_by_reference::<S, L, C>),
        )
        .route(
            "/bookings/{id}/confirm",
            post(routes::bookings::confirm::<S, L, C>),
        )
        .route(
            "/bookings/{id}/cancel",
            post(routes::bookings::cancel::<S, L, C>),
        )
        .route(
            "/users/{id}/bookings",
            get(routes::bookings::list_for_user::<S, L, C>),
        )
        .route("/shows/{id}/seats", get(routes::seats::list::<S, L, C>))
        .route(
            "/shows/{id}/seats/available",
            get(routes::seats::available::<S, L, C>),
        )
        .route(
            "/shows/{id}/inventory",
            get(routes::seats::inventory::<S, L, C>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the engine, orchestrator and read cache over the given stores.
///
/// Writes go through an engine that broadcasts invalidations; reads go through
/// the cache. The returned listener must be spawned for the cache to see
/// those invalidations.
pub fn create_state<S, L, C>(
    seats: S,
    ledger: L,
    catalog: C,
    config: ReservationConfig,
) -> (Arc<AppState<S, L, C>>, CacheListener<S>)
where
    S: SeatStore + Clone,
    L: BookingLedger,
    C: Catalog,
{
    let invalidator = BroadcastInvalidator::default();
    let receiver = invalidator.subscribe();

    let engine = ReservationEngine::new(seats.clone()).with_invalidation(Arc::new(invalidator));
    let orchestrator = Arc::new(BookingOrchestrator::new(engine, ledger, catalog, config));
    let cache = SeatCache::new(ReservationEngine::new(seats));
    let listener = cache.listen(receiver);

    let state = Arc::new(AppState {
        orchestrator,
        cache,
    });
    (state, listener)
}
