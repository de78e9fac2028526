//! Round trip against a real PostgreSQL.
//!
//! All tests are `#[ignore]` because they need a database. Each test works in
//! its own throwaway schema.
//!
//! Run with:
//! ```bash
//! DATABASE_URL=postgres://localhost/jqdata_test cargo test --test postgres_integration -- --ignored
//! ```

use std::str::FromStr;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use jqdata_ingest::config::DatabaseSettings;
use jqdata_ingest::prelude::*;
use jqdata_ingest::shared::still_listed_sentinel;
use jqdata_ingest::store::schema::ensure_schema;

async fn store_in_fresh_schema(name: &str) -> PgStore {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let bootstrap = PgStore::connect(&DatabaseSettings {
        url: url.clone(),
        ..DatabaseSettings::default()
    })
    .await
    .expect("connect");
    let schema = format!("jqdata_test_{}_{}", name, std::process::id());
    sqlx::query(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"))
        .execute(bootstrap.pool())
        .await
        .unwrap();
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(bootstrap.pool())
        .await
        .unwrap();

    let separator = if url.contains('?') { '&' } else { '?' };
    let store = PgStore::connect(&DatabaseSettings {
        url: format!("{url}{separator}schema={schema}"),
        ..DatabaseSettings::default()
    })
    .await
    .expect("connect with schema");
    ensure_schema(store.pool()).await.unwrap();
    // Re-running is a no-op.
    ensure_schema(store.pool()).await.unwrap();
    store
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn daily_bar(close: &str) -> DailyBar {
    DailyBar {
        code: Code::from("AU2412.XSGE"),
        date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        open: dec("548.02"),
        high: dec("553.5"),
        low: dec("546.9"),
        close: dec(close),
        volume: dec("183921"),
        money: dec("101002330000"),
        paused: false,
        high_limit: dec("595.6"),
        low_limit: dec("507.18"),
        avg: dec("549.16"),
        pre_close: dec("551.3"),
        open_interest: dec("178934"),
    }
}

#[tokio::test]
#[ignore]
async fn test_daily_upsert_is_idempotent() {
    let store = store_in_fresh_schema("daily").await;

    assert_eq!(store.upsert_daily_bars(&[daily_bar("551.4")]).await.unwrap(), 1);
    assert_eq!(store.upsert_daily_bars(&[daily_bar("552.0")]).await.unwrap(), 1);

    let rows: Vec<(String, Decimal)> =
        sqlx::query_as("SELECT code, close FROM futures_daily_bar")
            .fetch_all(store.pool())
            .await
            .unwrap();
    assert_eq!(rows, vec![("AU2412.XSGE".to_string(), dec("552.0"))]);
}

#[tokio::test]
#[ignore]
async fn test_minute_bars_keep_their_instant() {
    let store = store_in_fresh_schema("minute").await;
    let time = Utc.with_ymd_and_hms(2024, 6, 3, 1, 1, 0).unwrap();
    let bar = MinuteBar {
        code: Code::from("AU2412.XSGE"),
        time,
        open: dec("548.0"),
        high: dec("548.5"),
        low: dec("547.9"),
        close: dec("548.2"),
        volume: dec("120"),
        money: dec("65784000"),
        open_interest: dec("178900"),
    };

    assert_eq!(store.upsert_minute_bars(&[bar.clone(), bar]).await.unwrap(), 1);

    let stored: (chrono::DateTime<Utc>,) = sqlx::query_as("SELECT time FROM futures_minutely_bar")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(stored.0, time);
}

#[tokio::test]
#[ignore]
async fn test_security_queries() {
    let store = store_in_fresh_schema("securities").await;
    let info = |code: &str, start: (i32, u32, u32), end: NaiveDate| SecurityInfo {
        code: Code::from(code),
        display_name: code.to_string(),
        name: code.to_string(),
        start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
        end_date: end,
        kind: SecurityType::Futures,
    };

    store
        .upsert_securities(&[
            info("EXPIRED", (2023, 1, 2), NaiveDate::from_ymd_opt(2023, 12, 15).unwrap()),
            info("LIVE", (2024, 1, 2), still_listed_sentinel()),
        ])
        .await
        .unwrap();

    let on = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let active = store.active_securities(on).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].code, Code::from("LIVE"));

    let since = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    assert_eq!(store.securities_listed_since(since).await.unwrap().len(), 2);
    assert_eq!(store.all_securities().await.unwrap().len(), 2);
}
