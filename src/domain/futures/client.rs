//! Futures sub-client — tradable contracts and the dominant contract.

use crate::client::JqDataClient;
use crate::domain::futures::wire;
use crate::error::IngestResult;
use crate::parse::{parse_lines, parse_scalar};
use crate::shared::Code;

use chrono::NaiveDate;

pub struct Futures<'a> {
    pub(crate) client: &'a JqDataClient,
}

impl<'a> Futures<'a> {
    /// Contracts of `underlying` tradable on `date`.
    pub async fn contracts(&self, underlying: &str, date: NaiveDate) -> IngestResult<Vec<Code>> {
        let text = self
            .client
            .request(
                wire::CONTRACTS_METHOD,
                wire::underlying_params(underlying, date),
            )
            .await?;
        Ok(parse_lines(&text).into_iter().map(Code::from).collect())
    }

    /// Dominant contract of `underlying` on `date`; `None` when the provider
    /// has none for that day.
    pub async fn dominant(&self, underlying: &str, date: NaiveDate) -> IngestResult<Option<Code>> {
        let text = self
            .client
            .request(
                wire::DOMINANT_METHOD,
                wire::underlying_params(underlying, date),
            )
            .await?;
        Ok(parse_scalar(&text).map(Code::from))
    }
}
