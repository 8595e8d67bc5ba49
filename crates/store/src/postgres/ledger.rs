use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, PaymentId, ShowId, UserId};
use domain::{
    Booking, BookingParts, BookingReference, BookingStatus, Money, Payment, PaymentMethod,
    PaymentStatus, SeatSelection, TransactionId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use super::{corrupt, violated_constraint};
use crate::ledger::BookingLedger;
use crate::{Result, StoreError, UniqueConstraint};

const SELECT_BOOKING: &str = r#"
    SELECT b.id, b.reference, b.user_id, b.show_id, b.seat_numbers, b.total_amount_minor,
           b.status, b.created_at, b.updated_at,
           p.id AS payment_id, p.amount_minor, p.method, p.status AS payment_status,
           p.transaction_id, p.paid_at
    FROM bookings b
    LEFT JOIN payments p ON p.booking_id = b.id
"#;

/// PostgreSQL-backed booking ledger.
#[derive(Clone)]
pub struct PostgresBookingLedger {
    pool: PgPool,
}

impl PostgresBookingLedger {
    /// Creates a new PostgreSQL booking ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let id = BookingId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let seat_numbers: Vec<String> = row.try_get("seat_numbers")?;
        let status: String = row.try_get("status")?;

        let payment = match row.try_get::<Option<Uuid>, _>("payment_id")? {
            Some(payment_id) => {
                let method: String = row.try_get("method")?;
                let payment_status: String = row.try_get("payment_status")?;
                let transaction_id: String = row.try_get("transaction_id")?;
                Some(Payment {
                    id: PaymentId::from_uuid(payment_id),
                    booking_id: id,
                    amount: Money::from_minor(row.try_get("amount_minor")?),
                    method: method
                        .parse::<PaymentMethod>()
                        .map_err(|e| corrupt("payment method", e))?,
                    status: payment_status
                        .parse::<PaymentStatus>()
                        .map_err(|e| corrupt("payment status", e))?,
                    transaction_id: TransactionId::new(transaction_id),
                    paid_at: row.try_get::<DateTime<Utc>, _>("paid_at")?,
                })
            }
            None => None,
        };

        Ok(Booking::from_parts(BookingParts {
            id,
            reference: BookingReference::new(row.try_get::<String, _>("reference")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            show_id: ShowId::from_uuid(row.try_get::<Uuid, _>("show_id")?),
            seats: SeatSelection::parse(seat_numbers).map_err(|e| corrupt("booking seats", e))?,
            total_amount: Money::from_minor(row.try_get("total_amount_minor")?),
            status: status
                .parse::<BookingStatus>()
                .map_err(|e| corrupt("booking status", e))?,
            payment,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    async fn insert_payment(tx: &mut Transaction<'_, Postgres>, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, amount_minor, method, status, transaction_id, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.booking_id.as_uuid())
        .bind(payment.amount.minor())
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(payment.transaction_id.as_str())
        .bind(payment.paid_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if violated_constraint(&e) == Some("unique_transaction_id") {
                return StoreError::Conflict {
                    constraint: UniqueConstraint::TransactionId,
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }
}

#[async_trait]
impl BookingLedger for PostgresBookingLedger {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        let seat_numbers: Vec<&str> = booking.seat_numbers().iter().map(|s| s.as_str()).collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bookings (id, reference, user_id, show_id, seat_numbers, total_amount_minor, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id().as_uuid())
        .bind(booking.reference().as_str())
        .bind(booking.user_id().as_uuid())
        .bind(booking.show_id().as_uuid())
        .bind(&seat_numbers)
        .bind(booking.total_amount().minor())
        .bind(booking.status().as_str())
        .bind(booking.created_at())
        .bind(booking.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("unique_booking_reference") => StoreError::Conflict {
                constraint: UniqueConstraint::BookingReference,
            },
            Some("bookings_pkey") => StoreError::Conflict {
                constraint: UniqueConstraint::BookingId,
            },
            _ => StoreError::Database(e),
        })?;

        if let Some(payment) = booking.payment() {
            Self::insert_payment(&mut tx, payment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> Result<Option<Booking>> {
        let sql = format!("{SELECT_BOOKING} WHERE b.id = $1");
        let row = sqlx::query(&sql)
            .bind(booking_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn get_by_reference(&self, reference: &BookingReference) -> Result<Option<Booking>> {
        let sql = format!("{SELECT_BOOKING} WHERE b.reference = $1");
        let row = sqlx::query(&sql)
            .bind(reference.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let sql = format!("{SELECT_BOOKING} WHERE b.user_id = $1 ORDER BY b.created_at DESC");
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let sql = format!(
            "{SELECT_BOOKING} WHERE b.status = 'PENDING' AND b.created_at < $1 ORDER BY b.created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }

    async fn update(&self, booking: &Booking, expected: BookingStatus) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(booking.id().as_uuid())
        .bind(expected.as_str())
        .bind(booking.status().as_str())
        .bind(booking.updated_at())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let actual: Option<String> =
                sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                    .bind(booking.id().as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            let actual = actual
                .ok_or(StoreError::BookingNotFound(booking.id()))?
                .parse::<BookingStatus>()
                .map_err(|e| corrupt("booking status", e))?;
            return Err(StoreError::StatusMismatch {
                booking_id: booking.id(),
                expected,
                actual,
            });
        }

        let confirming =
            expected != BookingStatus::Confirmed && booking.status() == BookingStatus::Confirmed;
        if confirming && let Some(payment) = booking.payment() {
            Self::insert_payment(&mut tx, payment).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
