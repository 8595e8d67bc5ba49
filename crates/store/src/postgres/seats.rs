use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, ShowId};
use domain::{Seat, SeatNumber, SeatSelection, SeatStatus, ShowInventory};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use super::{corrupt, violated_constraint};
use crate::seats::{SeatStore, SeatTransition, TransitionOutcome};
use crate::{Result, StoreError};

/// PostgreSQL-backed seat store.
///
/// A transition runs in one database transaction: the requested seat rows are
/// locked with `SELECT … FOR UPDATE` in byte-wise seat-number order, then the
/// seats and the show's counter are written and committed together.
/// Dropping the transaction on any error rolls everything back.
#[derive(Clone)]
pub struct PostgresSeatStore {
    pool: PgPool,
}

impl PostgresSeatStore {
    /// Creates a new PostgreSQL seat store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_seat(show_id: ShowId, row: PgRow) -> Result<Seat> {
        let seat_number: String = row.try_get("seat_number")?;
        let status: String = row.try_get("status")?;
        let held_by: Option<Uuid> = row.try_get("held_by")?;

        Ok(Seat {
            show_id,
            seat_number: SeatNumber::parse(&seat_number)
                .map_err(|e| corrupt("seat number", e))?,
            status: status
                .parse::<SeatStatus>()
                .map_err(|e| corrupt("seat status", e))?,
            held_by: held_by.map(BookingId::from_uuid),
            last_modified: row.try_get::<DateTime<Utc>, _>("last_modified")?,
        })
    }

    fn row_to_inventory(show_id: ShowId, row: PgRow) -> Result<ShowInventory> {
        let total: i32 = row.try_get("total_seats")?;
        let available: i32 = row.try_get("available_seats")?;
        Ok(ShowInventory {
            show_id,
            total_seats: u32::try_from(total).map_err(|e| corrupt("total seats", e))?,
            available_seats: u32::try_from(available)
                .map_err(|e| corrupt("available seats", e))?,
        })
    }

    async fn show_exists(tx: &mut Transaction<'_, Postgres>, show_id: ShowId) -> Result<()> {
        let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM shows WHERE id = $1")
            .bind(show_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;
        found.map(|_| ()).ok_or(StoreError::ShowNotFound(show_id))
    }
}

#[async_trait]
impl SeatStore for PostgresSeatStore {
    async fn create_show(
        &self,
        show_id: ShowId,
        seats: Vec<SeatNumber>,
    ) -> Result<ShowInventory> {
        let labels: Vec<String> = seats
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();
        let total = i32::try_from(labels.len())
            .map_err(|_| StoreError::Unavailable("seat map too large".to_string()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO shows (id, total_seats, available_seats) VALUES ($1, $2, $2)")
            .bind(show_id.as_uuid())
            .bind(total)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if violated_constraint(&e) == Some("shows_pkey") {
                    return StoreError::ShowAlreadyExists(show_id);
                }
                StoreError::Database(e)
            })?;

        sqlx::query(
            r#"
            INSERT INTO seats (show_id, seat_number, status)
            SELECT $1, seat_number, 'AVAILABLE' FROM UNNEST($2::text[]) AS seat_number
            "#,
        )
        .bind(show_id.as_uuid())
        .bind(&labels)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(%show_id, total_seats = total, "Created seat map");
        Ok(ShowInventory::new(show_id, total as u32))
    }

    async fn transition(
        &self,
        show_id: ShowId,
        seats: &SeatSelection,
        transition: SeatTransition,
    ) -> Result<TransitionOutcome> {
        let requested: Vec<String> = seats
            .lock_order()
            .into_iter()
            .map(|number| number.as_str().to_string())
            .collect();

        let mut tx = self.pool.begin().await?;
        Self::show_exists(&mut tx, show_id).await?;

        // Row locks are taken in ORDER BY order; "C" collation matches the
        // byte-wise ordering every other writer uses.
        let rows = sqlx::query(
            r#"
            SELECT seat_number, status, held_by, last_modified
            FROM seats
            WHERE show_id = $1 AND seat_number = ANY($2)
            ORDER BY seat_number COLLATE "C"
            FOR UPDATE
            "#,
        )
        .bind(show_id.as_uuid())
        .bind(&requested)
        .fetch_all(&mut *tx)
        .await?;

        let locked = rows
            .into_iter()
            .map(|row| Self::row_to_seat(show_id, row))
            .collect::<Result<Vec<_>>>()?;

        if locked.len() != requested.len() {
            let found: BTreeSet<&str> = locked.iter().map(|s| s.seat_number.as_str()).collect();
            let missing = seats
                .lock_order()
                .into_iter()
                .filter(|number| !found.contains(number.as_str()))
                .cloned()
                .collect();
            return Err(StoreError::SeatNotFound {
                show_id,
                seats: missing,
            });
        }

        let changed = transition.plan(show_id, &locked)?;

        let inventory_row = if changed.is_empty() {
            sqlx::query("SELECT total_seats, available_seats FROM shows WHERE id = $1")
                .bind(show_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?
        } else {
            let labels: Vec<&str> = changed.iter().map(SeatNumber::as_str).collect();
            let held_by = match transition.to {
                SeatStatus::Available => None,
                _ => Some(transition.holder.as_uuid()),
            };

            sqlx::query(
                r#"
                UPDATE seats
                SET status = $3, held_by = $4, last_modified = NOW()
                WHERE show_id = $1 AND seat_number = ANY($2)
                "#,
            )
            .bind(show_id.as_uuid())
            .bind(&labels)
            .bind(transition.to.as_str())
            .bind(held_by)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE shows
                SET available_seats = available_seats + $2, updated_at = NOW()
                WHERE id = $1
                RETURNING total_seats, available_seats
                "#,
            )
            .bind(show_id.as_uuid())
            .bind(transition.available_delta(changed.len()) as i32)
            .fetch_one(&mut *tx)
            .await?
        };
        let inventory = Self::row_to_inventory(show_id, inventory_row)?;

        tx.commit().await?;

        Ok(TransitionOutcome { changed, inventory })
    }

    async fn seats(&self, show_id: ShowId) -> Result<Vec<Seat>> {
        let mut tx = self.pool.begin().await?;
        Self::show_exists(&mut tx, show_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT seat_number, status, held_by, last_modified
            FROM seats
            WHERE show_id = $1
            ORDER BY seat_number COLLATE "C"
            "#,
        )
        .bind(show_id.as_uuid())
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        rows.into_iter()
            .map(|row| Self::row_to_seat(show_id, row))
            .collect()
    }

    async fn inventory(&self, show_id: ShowId) -> Result<ShowInventory> {
        let row = sqlx::query("SELECT total_seats, available_seats FROM shows WHERE id = $1")
            .bind(show_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::ShowNotFound(show_id))?;

        Self::row_to_inventory(show_id, row)
    }
}
