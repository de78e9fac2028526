//! Bar domain — daily and intraday OHLC bars from `get_price`.

pub mod client;
mod convert;
pub mod wire;

use crate::shared::{Code, FrequencyUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub(crate) use convert::{daily_bars_from_table, minute_bars_from_table};

/// One trading day of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBar {
    pub code: Code,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub money: Decimal,
    pub paused: bool,
    pub high_limit: Decimal,
    pub low_limit: Decimal,
    pub avg: Decimal,
    pub pre_close: Decimal,
    pub open_interest: Decimal,
}

/// One intraday bar, keyed by the instant it closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteBar {
    pub code: Code,
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub money: Decimal,
    pub open_interest: Decimal,
}

/// A row dropped because it failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub code: Code,
    /// Raw `date` field of the row.
    pub at: String,
    pub reason: String,
}

/// Records that converted cleanly plus the rows that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parameters of one `get_price` call.
///
/// Either `count` (bars back from `end`, or from now) or a `start..end`
/// window; the provider rejects windows wider than its query limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarQuery {
    pub code: Code,
    pub unit: FrequencyUnit,
    pub count: Option<u32>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Include the still-forming bar. Provider default: true.
    pub include_now: Option<bool>,
    /// Skip suspended sessions. Provider default: true.
    pub skip_paused: Option<bool>,
    /// Price-adjustment reference date; unadjusted when absent.
    pub fq_ref_date: Option<NaiveDate>,
}

impl BarQuery {
    pub fn new(code: impl Into<Code>, unit: FrequencyUnit) -> Self {
        Self {
            code: code.into(),
            unit,
            count: None,
            start: None,
            end: None,
            include_now: None,
            skip_paused: None,
            fq_ref_date: None,
        }
    }

    pub fn daily(code: impl Into<Code>) -> Self {
        Self::new(code, FrequencyUnit::Day)
    }

    pub fn minutes(code: impl Into<Code>) -> Self {
        Self::new(code, FrequencyUnit::MINUTE)
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn include_now(mut self, include_now: bool) -> Self {
        self.include_now = Some(include_now);
        self
    }

    pub fn skip_paused(mut self, skip_paused: bool) -> Self {
        self.skip_paused = Some(skip_paused);
        self
    }

    pub fn fq_ref_date(mut self, date: NaiveDate) -> Self {
        self.fq_ref_date = Some(date);
        self
    }
}
