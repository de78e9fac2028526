//! Persistence — idempotent upserts keyed by natural keys.
//!
//! Every write is an overwrite: a second upsert of the same key replaces all
//! non-key columns. Within one batch the last record for a key wins.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

use crate::domain::bar::{DailyBar, MinuteBar};
use crate::domain::security::SecurityInfo;
use crate::error::StoreError;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Storage backend for instruments and bars.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Returns the number of rows written.
    async fn upsert_securities(&self, infos: &[SecurityInfo]) -> Result<u64, StoreError>;

    async fn upsert_daily_bars(&self, bars: &[DailyBar]) -> Result<u64, StoreError>;

    async fn upsert_minute_bars(&self, bars: &[MinuteBar]) -> Result<u64, StoreError>;

    /// Instruments with `start_date <= on <= end_date`.
    async fn active_securities(&self, on: NaiveDate) -> Result<Vec<SecurityInfo>, StoreError>;

    /// Instruments with `end_date >= since`.
    async fn securities_listed_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<SecurityInfo>, StoreError>;

    async fn all_securities(&self) -> Result<Vec<SecurityInfo>, StoreError>;
}

/// Keep the last record per key, in first-seen key order.
pub(crate) fn last_per_key<T, K, F>(items: &[T], key: F) -> Vec<&T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::with_capacity(items.len());
    let mut kept: Vec<&T> = Vec::with_capacity(items.len());
    for item in items {
        let k = key(item);
        if let Some(&slot) = slots.get(&k) {
            kept[slot] = item;
        } else {
            slots.insert(k, kept.len());
            kept.push(item);
        }
    }
    kept
}
