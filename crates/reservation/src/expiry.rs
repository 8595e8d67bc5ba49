//! Background expiry of seat holds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use store::{BookingLedger, SeatStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::catalog::Catalog;
use crate::config::ReservationConfig;
use crate::orchestrator::BookingOrchestrator;

/// Periodically expires pending bookings whose hold TTL has passed.
pub struct HoldSweeper<S, L, C>
where
    S: SeatStore,
    L: BookingLedger,
    C: Catalog,
{
    orchestrator: Arc<BookingOrchestrator<S, L, C>>,
    interval: Duration,
}

impl<S, L, C> HoldSweeper<S, L, C>
where
    S: SeatStore + 'static,
    L: BookingLedger + 'static,
    C: Catalog + 'static,
{
    /// Creates a sweeper running at the orchestrator's configured interval.
    pub fn new(orchestrator: Arc<BookingOrchestrator<S, L, C>>) -> Self {
        let interval = Some(orchestrator.config().sweep_interval)
            .filter(|interval| !interval.is_zero())
            .unwrap_or(ReservationConfig::default().sweep_interval);
        Self {
            orchestrator,
            interval,
        }
    }

    /// Overrides the sweep interval. A zero interval is ignored.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    /// Runs one sweep. Returns the number of holds expired.
    pub async fn sweep_once(&self) -> usize {
        match self.orchestrator.expire_stale_holds(Utc::now()).await {
            Ok(0) => 0,
            Ok(expired) => {
                tracing::info!(expired, "expired stale seat holds");
                expired
            }
            Err(err) => {
                tracing::warn!(error = %err, "hold sweep failed");
                0
            }
        }
    }

    /// Sweeps on every tick until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "hold sweeper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("hold sweeper stopped");
    }

    /// Spawns [`run`](Self::run) onto the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
