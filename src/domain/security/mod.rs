//! Security domain — instrument listings from `get_all_securities`.

pub mod client;
mod convert;
pub mod wire;

use crate::shared::{still_listed_sentinel, Code, SecurityType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub(crate) use convert::securities_from_table;

/// One listed instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub code: Code,
    pub display_name: String,
    pub name: String,
    pub start_date: NaiveDate,
    /// `2200-01-01` while the instrument is still listed.
    pub end_date: NaiveDate,
    pub kind: SecurityType,
}

impl SecurityInfo {
    /// Listed on `date`, both ends inclusive.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Still trading, or delisted no earlier than `since`.
    pub fn is_listed_since(&self, since: NaiveDate) -> bool {
        self.end_date >= since
    }

    pub fn is_still_listed(&self) -> bool {
        self.end_date >= still_listed_sentinel()
    }

    /// Trading span clipped to `today`; `None` if it starts after `today`.
    pub fn span_until(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let end = self.end_date.min(today);
        (self.start_date <= end).then_some((self.start_date, end))
    }
}
