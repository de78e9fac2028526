//! Response text parsing.
//!
//! The provider answers with one of three shapes: a bare value (token, count,
//! contract code), a newline-delimited list, or comma-delimited table text with
//! a header row. Table fields stay text until a caller asks for an explicit
//! coercion; a failed coercion is an error, never a default.

use crate::error::ParseError;
use crate::shared::{DATETIME_FORMAT, DATE_FORMAT};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Split a newline-delimited list. A blank body is an empty list.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// A single bare value such as a token or a contract code.
pub fn parse_scalar(text: &str) -> Option<&str> {
    let value = text.trim();
    (!value.is_empty()).then_some(value)
}

/// Shorthand for [`Table::parse`].
pub fn parse_table(text: &str) -> Result<Table, ParseError> {
    Table::parse(text)
}

/// Delimited table text with named columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse header + rows. A blank body is an empty table.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ParseError::Malformed(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ParseError::Malformed(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();

        Ok(Self {
            headers,
            index,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail unless every named column is present.
    pub fn require(&self, columns: &[&str]) -> Result<(), ParseError> {
        if self.rows.is_empty() {
            return Ok(());
        }
        match columns.iter().find(|c| !self.index.contains_key(**c)) {
            Some(missing) => Err(ParseError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row {
            table: self,
            values,
        })
    }
}

/// One table row; every accessor names the column it reads.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    values: &'a [String],
}

impl<'a> Row<'a> {
    /// Raw text of a field.
    pub fn field(&self, name: &str) -> Result<&'a str, ParseError> {
        self.table
            .index
            .get(name)
            .and_then(|&i| self.values.get(i))
            .map(String::as_str)
            .ok_or_else(|| ParseError::MissingColumn(name.to_string()))
    }

    /// Whether a field holds a finite decimal number.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.decimal(name).is_ok()
    }

    /// Decimal coercion; accepts plain and scientific notation.
    pub fn decimal(&self, name: &str) -> Result<Decimal, ParseError> {
        let raw = self.field(name)?;
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|_| ParseError::InvalidNumber {
                field: name.to_string(),
                value: raw.to_string(),
            })
    }

    /// Integer-then-boolean coercion: any non-zero integer is `true`.
    pub fn flag(&self, name: &str) -> Result<bool, ParseError> {
        let raw = self.field(name)?;
        let invalid = || ParseError::InvalidFlag {
            field: name.to_string(),
            value: raw.to_string(),
        };
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(n != 0);
        }
        let n = Decimal::from_str(raw).map_err(|_| invalid())?;
        if !n.fract().is_zero() {
            return Err(invalid());
        }
        Ok(!n.is_zero())
    }

    /// Calendar date (`yyyy-MM-dd`), used for daily-granularity data.
    pub fn date(&self, name: &str) -> Result<NaiveDate, ParseError> {
        let raw = self.field(name)?;
        NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ParseError::InvalidDate {
            field: name.to_string(),
            value: raw.to_string(),
        })
    }

    /// Local datetime (`yyyy-MM-dd HH:mm:ss`) in `tz`, returned as an instant.
    pub fn datetime(&self, name: &str, tz: Tz) -> Result<DateTime<Utc>, ParseError> {
        let raw = self.field(name)?;
        let invalid = || ParseError::InvalidDateTime {
            field: name.to_string(),
            value: raw.to_string(),
        };
        let naive = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|_| invalid())?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_lines() {
        assert_eq!(
            parse_lines("2024-01-02\n2024-01-03\n"),
            vec!["2024-01-02", "2024-01-03"]
        );
        assert!(parse_lines("").is_empty());
        assert!(parse_lines("\n  \n").is_empty());
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("  5fe1a2b3\n"), Some("5fe1a2b3"));
        assert_eq!(parse_scalar("   "), None);
    }

    #[test]
    fn test_table_keys_rows_by_header() {
        let table = parse_table("code,display_name\nA2405.XDCE,豆一2405\nM2405.XDCE,豆粕2405").unwrap();
        assert_eq!(table.headers(), ["code", "display_name"]);
        assert_eq!(table.len(), 2);

        let names: Vec<_> = table
            .rows()
            .map(|r| r.field("display_name").unwrap())
            .collect();
        assert_eq!(names, ["豆一2405", "豆粕2405"]);
    }

    #[test]
    fn test_blank_body_is_empty_table() {
        let table = Table::parse("").unwrap();
        assert!(table.is_empty());
        assert!(table.require(&["code"]).is_ok());
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = Table::parse("date,open,close\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let err = Table::parse("a,b\n1,2,3").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn test_require_reports_missing_column() {
        let table = Table::parse("date,open\n2024-01-02,1").unwrap();
        assert_eq!(
            table.require(&["date", "close"]),
            Err(ParseError::MissingColumn("close".into()))
        );
    }

    #[test]
    fn test_decimal_coercion() {
        let table = Table::parse("a,b,c,d\n3512.5,1.5e-05,nan,").unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row.decimal("a").unwrap(), Decimal::from_str("3512.5").unwrap());
        assert_eq!(row.decimal("b").unwrap(), Decimal::from_str("0.000015").unwrap());
        assert!(matches!(row.decimal("c"), Err(ParseError::InvalidNumber { .. })));
        assert!(!row.is_numeric("d"));
    }

    #[test]
    fn test_flag_coercion() {
        let table = Table::parse("a,b,c,d,e\n0,1,1.0,0.5,yes").unwrap();
        let row = table.rows().next().unwrap();
        assert!(!row.flag("a").unwrap());
        assert!(row.flag("b").unwrap());
        assert!(row.flag("c").unwrap());
        assert!(row.flag("d").is_err());
        assert!(row.flag("e").is_err());
    }

    #[test]
    fn test_date_and_datetime_formats_are_distinct() {
        let table = Table::parse("d,t\n2024-01-02,2024-01-02 09:01:00").unwrap();
        let row = table.rows().next().unwrap();

        assert_eq!(row.date("d").unwrap(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(matches!(row.date("t"), Err(ParseError::InvalidDate { .. })));

        let instant = row.datetime("t", chrono_tz::Asia::Shanghai).unwrap();
        assert_eq!(instant.hour(), 1);
        assert_eq!(instant.minute(), 1);
        assert!(matches!(
            row.datetime("d", chrono_tz::Asia::Shanghai),
            Err(ParseError::InvalidDateTime { .. })
        ));
    }
}
