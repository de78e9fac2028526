//! Calendar domain — exchange trading days.

pub mod client;
pub mod wire;

use crate::error::ParseError;
use crate::parse::parse_lines;
use crate::shared::DATE_FORMAT;
use chrono::NaiveDate;

/// One date per line; a blank body means no trading days.
pub(crate) fn trade_days_from_text(text: &str) -> Result<Vec<NaiveDate>, ParseError> {
    parse_lines(text)
        .into_iter()
        .map(|line| {
            NaiveDate::parse_from_str(&line, DATE_FORMAT).map_err(|_| ParseError::InvalidDate {
                field: "trade_day".to_string(),
                value: line,
            })
        })
        .collect()
}
