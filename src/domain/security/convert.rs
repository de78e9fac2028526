//! Conversions from table rows to security records.

use super::wire::COLUMNS;
use super::SecurityInfo;
use crate::error::ParseError;
use crate::parse::{Row, Table};
use crate::shared::SecurityType;

impl TryFrom<Row<'_>> for SecurityInfo {
    type Error = ParseError;

    fn try_from(row: Row<'_>) -> Result<Self, Self::Error> {
        let kind = row.field("type")?;
        Ok(Self {
            code: row.field("code")?.into(),
            display_name: row.field("display_name")?.to_string(),
            name: row.field("name")?.to_string(),
            start_date: row.date("start_date")?,
            end_date: row.date("end_date")?,
            kind: kind
                .parse::<SecurityType>()
                .map_err(ParseError::UnknownSecurityType)?,
        })
    }
}

pub(crate) fn securities_from_table(table: &Table) -> Result<Vec<SecurityInfo>, ParseError> {
    table.require(&COLUMNS)?;
    table.rows().map(SecurityInfo::try_from).collect()
}
