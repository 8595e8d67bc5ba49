//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use common::ShowId;
use domain::{Money, SeatLayout, ShowDetails};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation::{ErrorKind, HoldSweeper, InMemoryCatalog, ReservationConfig};
use sqlx::postgres::PgPoolOptions;
use store::{
    BookingLedger, InMemoryBookingLedger, InMemorySeatStore, PostgresBookingLedger,
    PostgresSeatStore, SeatStore,
};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fixed id of the show seeded at startup, so restarts against the same
/// database find its seat map again.
const DEMO_SHOW_ID: u128 = 0x5eed_0000_0000_4000_8000_0000_0000_0001;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Registers the demo show in the catalog and creates its seat map.
async fn seed_demo_show<S, L>(
    orchestrator: &reservation::BookingOrchestrator<S, L, InMemoryCatalog>,
) -> Result<ShowId, BoxError>
where
    S: SeatStore,
    L: BookingLedger,
{
    let show_id = ShowId::from_uuid(uuid::Uuid::from_u128(DEMO_SHOW_ID));
    let layout = SeatLayout::new(10, 12)?;
    orchestrator
        .catalog()
        .add_show(ShowDetails {
            id: show_id,
            price: Money::from_major(250),
            total_seats: layout.total_seats(),
        })
        .await;

    match orchestrator.engine().create_show(show_id, layout).await {
        Ok(_) => tracing::info!(%show_id, "demo show seeded"),
        Err(err) if err.kind() == ErrorKind::Conflict => {
            tracing::info!(%show_id, "demo show already present");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(show_id)
}

async fn serve<S, L>(
    config: Config,
    reservation_config: ReservationConfig,
    seats: S,
    ledger: L,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError>
where
    S: SeatStore + Clone + 'static,
    L: BookingLedger + 'static,
{
    let (state, cache_listener) =
        api::create_state(seats, ledger, InMemoryCatalog::new(), reservation_config);
    seed_demo_show(&state.orchestrator).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cache_task = cache_listener.spawn(shutdown_rx.clone());
    let sweeper_task = HoldSweeper::new(Arc::clone(&state.orchestrator)).spawn(shutdown_rx);

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(cache_task, sweeper_task);
    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();
    init_tracing(&config);

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    let reservation_config = ReservationConfig::from_env();
    tracing::info!(?reservation_config, "reservation settings loaded");

    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(&url).await?;
            store::run_migrations(&pool).await?;
            tracing::info!("using PostgreSQL stores");
            serve(
                config,
                reservation_config,
                PostgresSeatStore::new(pool.clone()),
                PostgresBookingLedger::new(pool),
                metrics_handle,
            )
            .await
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            serve(
                config,
                reservation_config,
                InMemorySeatStore::new(),
                InMemoryBookingLedger::new(),
                metrics_handle,
            )
            .await
        }
    }
}
