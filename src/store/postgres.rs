//! PostgreSQL store on a sqlx pool.
//!
//! Upserts are multi-row `INSERT … ON CONFLICT DO UPDATE` statements built with
//! [`QueryBuilder::push_values`], split so no statement exceeds the protocol's
//! bind-parameter limit. Each batch is one statement; a failure leaves earlier
//! batches committed.

use super::{last_per_key, BarStore};
use crate::config::DatabaseSettings;
use crate::domain::bar::{DailyBar, MinuteBar};
use crate::domain::security::SecurityInfo;
use crate::error::StoreError;
use crate::shared::SecurityType;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::{debug, info};

/// Postgres wire protocol limit on bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;

const SECURITY_TABLE: &str = "futures_info";
const SECURITY_KEY: &[&str] = &["code"];
const SECURITY_COLUMNS: &[&str] = &["code", "display_name", "name", "start_date", "end_date"];

const DAILY_TABLE: &str = "futures_daily_bar";
const DAILY_KEY: &[&str] = &["code", "date"];
const DAILY_COLUMNS: &[&str] = &[
    "code",
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "money",
    "paused",
    "high_limit",
    "low_limit",
    "avg",
    "pre_close",
    "open_interest",
];

const MINUTE_TABLE: &str = "futures_minutely_bar";
const MINUTE_KEY: &[&str] = &["code", "time"];
const MINUTE_COLUMNS: &[&str] = &[
    "code",
    "time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "money",
    "open_interest",
];

/// [`BarStore`] backed by a [`PgPool`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool. Every new connection gets the configured session time
    /// zone and, when the URL names one, the schema as its `search_path`.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let target = settings.target();
        let time_zone = settings.time_zone;
        let schema = target.schema.clone();

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .after_connect(move |conn, _meta| {
                let schema = schema.clone();
                Box::pin(async move {
                    let set_tz = format!("SET TIME ZONE '{}'", time_zone.name());
                    sqlx::query(&set_tz).execute(&mut *conn).await?;
                    if let Some(schema) = schema {
                        let set_path = format!("SET search_path TO {}", quote_ident(&schema));
                        sqlx::query(&set_path).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(&target.url)
            .await?;

        info!(
            max_connections = settings.max_connections,
            schema = target.schema.as_deref().unwrap_or("public"),
            time_zone = time_zone.name(),
            "connected to postgres"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_securities(
        &self,
        filter: &str,
        on: Option<NaiveDate>,
    ) -> Result<Vec<SecurityInfo>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} {} ORDER BY code",
            SECURITY_COLUMNS.join(", "),
            SECURITY_TABLE,
            filter
        );
        let mut query = sqlx::query(&sql);
        if let Some(on) = on {
            query = query.bind(on);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(security_from_row).collect()
    }
}

#[async_trait]
impl BarStore for PgStore {
    async fn upsert_securities(&self, infos: &[SecurityInfo]) -> Result<u64, StoreError> {
        let rows = last_per_key(infos, |i| i.code.clone());
        let mut written = 0;
        for batch in rows.chunks(rows_per_batch(SECURITY_COLUMNS.len())) {
            let mut qb = insert_into(SECURITY_TABLE, SECURITY_COLUMNS);
            qb.push_values(batch, |mut b, info| {
                b.push_bind(info.code.as_str())
                    .push_bind(info.display_name.as_str())
                    .push_bind(info.name.as_str())
                    .push_bind(info.start_date)
                    .push_bind(info.end_date);
            });
            qb.push(conflict_clause(SECURITY_KEY, SECURITY_COLUMNS));
            written += qb.build().execute(&self.pool).await?.rows_affected();
        }
        debug!(table = SECURITY_TABLE, rows = written, "upserted");
        Ok(written)
    }

    async fn upsert_daily_bars(&self, bars: &[DailyBar]) -> Result<u64, StoreError> {
        let rows = last_per_key(bars, |b| (b.code.clone(), b.date));
        let mut written = 0;
        for batch in rows.chunks(rows_per_batch(DAILY_COLUMNS.len())) {
            let mut qb = insert_into(DAILY_TABLE, DAILY_COLUMNS);
            qb.push_values(batch, |mut b, bar| {
                b.push_bind(bar.code.as_str())
                    .push_bind(bar.date)
                    .push_bind(bar.open)
                    .push_bind(bar.high)
                    .push_bind(bar.low)
                    .push_bind(bar.close)
                    .push_bind(bar.volume)
                    .push_bind(bar.money)
                    .push_bind(bar.paused)
                    .push_bind(bar.high_limit)
                    .push_bind(bar.low_limit)
                    .push_bind(bar.avg)
                    .push_bind(bar.pre_close)
                    .push_bind(bar.open_interest);
            });
            qb.push(conflict_clause(DAILY_KEY, DAILY_COLUMNS));
            written += qb.build().execute(&self.pool).await?.rows_affected();
        }
        debug!(table = DAILY_TABLE, rows = written, "upserted");
        Ok(written)
    }

    async fn upsert_minute_bars(&self, bars: &[MinuteBar]) -> Result<u64, StoreError> {
        let rows = last_per_key(bars, |b| (b.code.clone(), b.time));
        let mut written = 0;
        for batch in rows.chunks(rows_per_batch(MINUTE_COLUMNS.len())) {
            let mut qb = insert_into(MINUTE_TABLE, MINUTE_COLUMNS);
            qb.push_values(batch, |mut b, bar| {
                b.push_bind(bar.code.as_str())
                    .push_bind(bar.time)
                    .push_bind(bar.open)
                    .push_bind(bar.high)
                    .push_bind(bar.low)
                    .push_bind(bar.close)
                    .push_bind(bar.volume)
                    .push_bind(bar.money)
                    .push_bind(bar.open_interest);
            });
            qb.push(conflict_clause(MINUTE_KEY, MINUTE_COLUMNS));
            written += qb.build().execute(&self.pool).await?.rows_affected();
        }
        debug!(table = MINUTE_TABLE, rows = written, "upserted");
        Ok(written)
    }

    async fn active_securities(&self, on: NaiveDate) -> Result<Vec<SecurityInfo>, StoreError> {
        self.fetch_securities("WHERE start_date <= $1 AND end_date >= $1", Some(on))
            .await
    }

    async fn securities_listed_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<SecurityInfo>, StoreError> {
        self.fetch_securities("WHERE end_date >= $1", Some(since))
            .await
    }

    async fn all_securities(&self) -> Result<Vec<SecurityInfo>, StoreError> {
        self.fetch_securities("", None).await
    }
}

fn security_from_row(row: &PgRow) -> Result<SecurityInfo, StoreError> {
    Ok(SecurityInfo {
        code: row.try_get::<String, _>("code")?.into(),
        display_name: row.try_get("display_name")?,
        name: row.try_get("name")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        kind: SecurityType::Futures,
    })
}

fn rows_per_batch(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns.max(1)).max(1)
}

fn insert_into<'args>(table: &str, columns: &[&str]) -> QueryBuilder<'args, Postgres> {
    QueryBuilder::new(format!("INSERT INTO {} ({}) ", table, columns.join(", ")))
}

/// `ON CONFLICT (<key>) DO UPDATE SET c = EXCLUDED.c, …` over every non-key column.
fn conflict_clause(key: &[&str], columns: &[&str]) -> String {
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !key.contains(*c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        " ON CONFLICT ({}) DO UPDATE SET {}",
        key.join(", "),
        updates.join(", ")
    )
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_clause_updates_every_non_key_column() {
        assert_eq!(
            conflict_clause(SECURITY_KEY, SECURITY_COLUMNS),
            " ON CONFLICT (code) DO UPDATE SET display_name = EXCLUDED.display_name, \
             name = EXCLUDED.name, start_date = EXCLUDED.start_date, end_date = EXCLUDED.end_date"
        );

        let daily = conflict_clause(DAILY_KEY, DAILY_COLUMNS);
        assert!(daily.starts_with(" ON CONFLICT (code, date) DO UPDATE SET open = EXCLUDED.open"));
        assert!(!daily.contains("code = EXCLUDED.code"));
        assert!(!daily.contains("date = EXCLUDED.date"));
        assert_eq!(daily.matches("EXCLUDED.").count(), DAILY_COLUMNS.len() - 2);
    }

    #[test]
    fn test_batches_stay_under_bind_limit() {
        assert_eq!(rows_per_batch(DAILY_COLUMNS.len()), 4681);
        assert!(rows_per_batch(DAILY_COLUMNS.len()) * DAILY_COLUMNS.len() <= MAX_BIND_PARAMS);
        assert_eq!(rows_per_batch(0), MAX_BIND_PARAMS);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("market"), "\"market\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
