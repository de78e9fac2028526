//! Conversions from `get_price` tables to bar records.
//!
//! The instrument code always comes from the query; a `code` column in the
//! table, if any, is ignored. A row whose `close` is not a number is skipped
//! and reported; any other bad field fails the whole table.

use super::wire::{DAILY_COLUMNS, MINUTE_COLUMNS};
use super::{DailyBar, MinuteBar, Parsed, RejectedRow};
use crate::error::ParseError;
use crate::parse::{Row, Table};
use crate::shared::Code;

use chrono_tz::Tz;
use tracing::warn;

pub(crate) fn daily_bars_from_table(
    code: &Code,
    table: &Table,
) -> Result<Parsed<DailyBar>, ParseError> {
    collect(code, table, &DAILY_COLUMNS, |row| {
        Ok(DailyBar {
            code: code.clone(),
            date: row.date("date")?,
            open: row.decimal("open")?,
            high: row.decimal("high")?,
            low: row.decimal("low")?,
            close: row.decimal("close")?,
            volume: row.decimal("volume")?,
            money: row.decimal("money")?,
            paused: row.flag("paused")?,
            high_limit: row.decimal("high_limit")?,
            low_limit: row.decimal("low_limit")?,
            avg: row.decimal("avg")?,
            pre_close: row.decimal("pre_close")?,
            open_interest: row.decimal("open_interest")?,
        })
    })
}

pub(crate) fn minute_bars_from_table(
    code: &Code,
    table: &Table,
    tz: Tz,
) -> Result<Parsed<MinuteBar>, ParseError> {
    collect(code, table, &MINUTE_COLUMNS, |row| {
        Ok(MinuteBar {
            code: code.clone(),
            time: row.datetime("date", tz)?,
            open: row.decimal("open")?,
            high: row.decimal("high")?,
            low: row.decimal("low")?,
            close: row.decimal("close")?,
            volume: row.decimal("volume")?,
            money: row.decimal("money")?,
            open_interest: row.decimal("open_interest")?,
        })
    })
}

fn collect<T>(
    code: &Code,
    table: &Table,
    columns: &[&str],
    convert: impl Fn(Row<'_>) -> Result<T, ParseError>,
) -> Result<Parsed<T>, ParseError> {
    table.require(columns)?;

    let mut parsed = Parsed::default();
    for row in table.rows() {
        if !row.is_numeric("close") {
            let at = row.field("date")?.to_string();
            let close = row.field("close")?;
            warn!(code = %code, at = %at, close, "skipping bar with non-numeric close");
            parsed.rejected.push(RejectedRow {
                code: code.clone(),
                at,
                reason: format!("non-numeric close {:?}", close),
            });
            continue;
        }
        parsed.records.push(convert(row)?);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const DAILY: &str = "\
date,open,close,high,low,volume,money,paused,high_limit,low_limit,avg,pre_close,open_interest
2024-06-03,548.02,551.4,553.5,546.9,183921.0,101002330000.0,0.0,595.6,507.18,549.16,551.3,178934.0
2024-06-04,551.0,nan,552.0,549.0,0.0,0.0,1.0,596.0,508.0,0.0,551.4,178934.0
";

    #[test]
    fn test_daily_rows_coerce_and_skip_bad_close() {
        let code = Code::from("AU2412.XSGE");
        let parsed = daily_bars_from_table(&code, &Table::parse(DAILY).unwrap()).unwrap();

        assert_eq!(parsed.records.len(), 1);
        let bar = &parsed.records[0];
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(bar.close, dec("551.4"));
        assert_eq!(bar.money, dec("101002330000.0"));
        assert!(!bar.paused);

        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].at, "2024-06-04");
        assert!(!parsed.is_clean());
    }

    #[test]
    fn test_minute_row_takes_code_from_query() {
        let text = "\
date,code,open,high,low,close,volume,money,open_interest
2024-06-03 09:01:00,SOMETHING.ELSE,548.0,548.5,547.9,548.2,120.0,65784000.0,178900.0
";
        let code = Code::from("AU2412.XSGE");
        let parsed = minute_bars_from_table(
            &code,
            &Table::parse(text).unwrap(),
            chrono_tz::Asia::Shanghai,
        )
        .unwrap();

        assert!(parsed.is_clean());
        assert_eq!(parsed.records.len(), 1);
        let bar = &parsed.records[0];
        assert_eq!(bar.code, code);
        assert_eq!(bar.time, Utc.with_ymd_and_hms(2024, 6, 3, 1, 1, 0).unwrap());
        assert_eq!(bar.open, dec("548.0"));
        assert_eq!(bar.high, dec("548.5"));
        assert_eq!(bar.low, dec("547.9"));
        assert_eq!(bar.close, dec("548.2"));
        assert_eq!(bar.volume, dec("120"));
        assert_eq!(bar.money, dec("65784000"));
        assert_eq!(bar.open_interest, dec("178900"));
    }

    #[test]
    fn test_bad_non_close_field_fails_the_table() {
        let text = "\
date,open,high,low,close,volume,money,open_interest
2024-06-03 09:01:00,abc,548.5,547.9,548.2,120.0,65784000.0,178900.0
";
        let err = minute_bars_from_table(
            &Code::from("AU2412.XSGE"),
            &Table::parse(text).unwrap(),
            chrono_tz::Asia::Shanghai,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { ref field, .. } if field == "open"));
    }

    #[test]
    fn test_empty_response_is_empty_batch() {
        let parsed = daily_bars_from_table(&Code::from("X"), &Table::parse("").unwrap()).unwrap();
        assert!(parsed.records.is_empty());
        assert!(parsed.is_clean());
    }
}
