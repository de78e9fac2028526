//! Securities sub-client — instrument listings.

use crate::client::JqDataClient;
use crate::domain::security::{securities_from_table, wire, SecurityInfo};
use crate::error::IngestResult;
use crate::parse::Table;
use crate::shared::SecurityType;

use chrono::NaiveDate;
use tracing::debug;

pub struct Securities<'a> {
    pub(crate) client: &'a JqDataClient,
}

impl<'a> Securities<'a> {
    /// Instruments of one type; listed on `date` when given, else ever issued.
    pub async fn list(
        &self,
        kind: SecurityType,
        date: Option<NaiveDate>,
    ) -> IngestResult<Vec<SecurityInfo>> {
        let text = self
            .client
            .request(wire::METHOD, wire::list_params(kind, date))
            .await?;
        let infos = securities_from_table(&Table::parse(&text)?)?;
        debug!(kind = %kind, ?date, count = infos.len(), "listed securities");
        Ok(infos)
    }

    /// Every futures contract the provider knows about.
    pub async fn all_futures(&self) -> IngestResult<Vec<SecurityInfo>> {
        self.list(SecurityType::Futures, None).await
    }

    /// Futures contracts listed on `date`.
    pub async fn futures_on(&self, date: NaiveDate) -> IngestResult<Vec<SecurityInfo>> {
        self.list(SecurityType::Futures, Some(date)).await
    }
}
