//! Table and index definitions.

use crate::error::StoreError;
use sqlx::PgPool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS futures_info (
        code text PRIMARY KEY,
        display_name text NOT NULL,
        name text NOT NULL,
        start_date date NOT NULL,
        end_date date NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_start_date ON futures_info (start_date)",
    "CREATE INDEX IF NOT EXISTS idx_end_date ON futures_info (end_date)",
    "CREATE TABLE IF NOT EXISTS futures_daily_bar (
        code text NOT NULL,
        date date NOT NULL,
        open numeric NOT NULL,
        high numeric NOT NULL,
        low numeric NOT NULL,
        close numeric NOT NULL,
        volume numeric NOT NULL,
        money numeric NOT NULL,
        paused boolean NOT NULL,
        high_limit numeric NOT NULL,
        low_limit numeric NOT NULL,
        avg numeric NOT NULL,
        pre_close numeric NOT NULL,
        open_interest numeric NOT NULL,
        PRIMARY KEY (code, date)
    )",
    "CREATE INDEX IF NOT EXISTS idx_code ON futures_daily_bar (code)",
    "CREATE INDEX IF NOT EXISTS idx_date ON futures_daily_bar (date)",
    "CREATE TABLE IF NOT EXISTS futures_minutely_bar (
        code text NOT NULL,
        time timestamptz NOT NULL,
        open numeric NOT NULL,
        high numeric NOT NULL,
        low numeric NOT NULL,
        close numeric NOT NULL,
        volume numeric NOT NULL,
        money numeric NOT NULL,
        open_interest numeric NOT NULL,
        PRIMARY KEY (code, time)
    )",
    "CREATE INDEX IF NOT EXISTS idx_minutely_code ON futures_minutely_bar (code)",
    "CREATE INDEX IF NOT EXISTS idx_minutely_time ON futures_minutely_bar (time)",
];

/// Create the tables and indexes if they do not exist. Safe to re-run.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!(statements = STATEMENTS.len(), "schema ensured");
    Ok(())
}
