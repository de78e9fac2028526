//! In-process store with the same upsert semantics as Postgres.

use super::{last_per_key, BarStore};
use crate::domain::bar::{DailyBar, MinuteBar};
use crate::domain::security::SecurityInfo;
use crate::error::StoreError;
use crate::shared::Code;

use async_lock::RwLock;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Tables {
    securities: BTreeMap<Code, SecurityInfo>,
    daily: BTreeMap<(Code, NaiveDate), DailyBar>,
    minute: BTreeMap<(Code, DateTime<Utc>), MinuteBar>,
}

/// `BTreeMap`-backed [`BarStore`] for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn security(&self, code: &Code) -> Option<SecurityInfo> {
        self.tables.read().await.securities.get(code).cloned()
    }

    pub async fn daily_bar(&self, code: &Code, date: NaiveDate) -> Option<DailyBar> {
        self.tables
            .read()
            .await
            .daily
            .get(&(code.clone(), date))
            .cloned()
    }

    /// All daily bars ordered by `(code, date)`.
    pub async fn daily_bars(&self) -> Vec<DailyBar> {
        self.tables.read().await.daily.values().cloned().collect()
    }

    /// All minute bars ordered by `(code, time)`.
    pub async fn minute_bars(&self) -> Vec<MinuteBar> {
        self.tables.read().await.minute.values().cloned().collect()
    }
}

#[async_trait]
impl BarStore for MemoryStore {
    async fn upsert_securities(&self, infos: &[SecurityInfo]) -> Result<u64, StoreError> {
        let rows = last_per_key(infos, |i| i.code.clone());
        let mut tables = self.tables.write().await;
        for info in &rows {
            tables.securities.insert(info.code.clone(), (*info).clone());
        }
        Ok(rows.len() as u64)
    }

    async fn upsert_daily_bars(&self, bars: &[DailyBar]) -> Result<u64, StoreError> {
        let rows = last_per_key(bars, |b| (b.code.clone(), b.date));
        let mut tables = self.tables.write().await;
        for bar in &rows {
            tables
                .daily
                .insert((bar.code.clone(), bar.date), (*bar).clone());
        }
        Ok(rows.len() as u64)
    }

    async fn upsert_minute_bars(&self, bars: &[MinuteBar]) -> Result<u64, StoreError> {
        let rows = last_per_key(bars, |b| (b.code.clone(), b.time));
        let mut tables = self.tables.write().await;
        for bar in &rows {
            tables
                .minute
                .insert((bar.code.clone(), bar.time), (*bar).clone());
        }
        Ok(rows.len() as u64)
    }

    async fn active_securities(&self, on: NaiveDate) -> Result<Vec<SecurityInfo>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .securities
            .values()
            .filter(|i| i.is_active_on(on))
            .cloned()
            .collect())
    }

    async fn securities_listed_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<SecurityInfo>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .securities
            .values()
            .filter(|i| i.is_listed_since(since))
            .cloned()
            .collect())
    }

    async fn all_securities(&self) -> Result<Vec<SecurityInfo>, StoreError> {
        Ok(self.tables.read().await.securities.values().cloned().collect())
    }
}
