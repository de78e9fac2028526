//! Calendar sub-client.

use crate::client::JqDataClient;
use crate::domain::calendar::{trade_days_from_text, wire};
use crate::error::IngestResult;

use chrono::NaiveDate;

pub struct Calendar<'a> {
    pub(crate) client: &'a JqDataClient,
}

impl<'a> Calendar<'a> {
    /// Trading days in `[start, end]`, ascending.
    pub async fn trade_days(&self, start: NaiveDate, end: NaiveDate) -> IngestResult<Vec<NaiveDate>> {
        let text = self
            .client
            .request(wire::METHOD, wire::range_params(start, end))
            .await?;
        Ok(trade_days_from_text(&text)?)
    }

    pub async fn is_trade_day(&self, date: NaiveDate) -> IngestResult<bool> {
        Ok(self.trade_days(date, date).await?.contains(&date))
    }
}
