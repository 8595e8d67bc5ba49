//! PostgreSQL backends.

mod ledger;
mod seats;

pub use ledger::PostgresBookingLedger;
pub use seats::PostgresSeatStore;

use sqlx::PgPool;

use crate::StoreError;

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// Returns the name of the constraint a database error violated, if any.
fn violated_constraint(error: &sqlx::Error) -> Option<&str> {
    match error {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {detail}"))
}
