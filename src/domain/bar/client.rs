//! Bars sub-client — `get_price` for daily and intraday units.

use crate::client::JqDataClient;
use crate::domain::bar::{
    daily_bars_from_table, minute_bars_from_table, wire, BarQuery, DailyBar, MinuteBar, Parsed,
};
use crate::error::{IngestError, IngestResult};
use crate::parse::Table;
use crate::shared::FrequencyUnit;

pub struct Bars<'a> {
    pub(crate) client: &'a JqDataClient,
}

impl<'a> Bars<'a> {
    /// Daily bars. The query unit must be `1d`.
    pub async fn daily(&self, query: &BarQuery) -> IngestResult<Parsed<DailyBar>> {
        if query.unit != FrequencyUnit::Day {
            return Err(IngestError::Validation(format!(
                "daily bars need unit 1d, got {}",
                query.unit
            )));
        }
        let table = self.fetch(query).await?;
        Ok(daily_bars_from_table(&query.code, &table)?)
    }

    /// Intraday bars (`1m`..`120m`). Daily and longer units are rejected.
    pub async fn minutes(&self, query: &BarQuery) -> IngestResult<Parsed<MinuteBar>> {
        if !query.unit.is_intraday() {
            return Err(IngestError::Validation(format!(
                "unit {} is not intraday, use bars().daily() instead",
                query.unit
            )));
        }
        let table = self.fetch(query).await?;
        Ok(minute_bars_from_table(
            &query.code,
            &table,
            self.client.time_zone(),
        )?)
    }

    async fn fetch(&self, query: &BarQuery) -> IngestResult<Table> {
        let text = self
            .client
            .request(wire::METHOD, wire::price_params(query))
            .await?;
        Ok(Table::parse(&text)?)
    }
}
