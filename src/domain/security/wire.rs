//! Request parameters and table columns for `get_all_securities`.

use crate::shared::{format_date, SecurityType};
use chrono::NaiveDate;
use serde_json::{Map, Value};

pub const METHOD: &str = "get_all_securities";

pub const COLUMNS: [&str; 6] = ["code", "display_name", "name", "start_date", "end_date", "type"];

/// `code` is the security type; without `date` the provider lists every
/// instrument ever issued.
pub fn list_params(kind: SecurityType, date: Option<NaiveDate>) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("code".into(), Value::from(kind.as_str()));
    if let Some(date) = date {
        params.insert("date".into(), Value::from(format_date(date)));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params() {
        let all = list_params(SecurityType::Futures, None);
        assert_eq!(all.get("code"), Some(&Value::from("futures")));
        assert!(!all.contains_key("date"));

        let on = list_params(SecurityType::Futures, NaiveDate::from_ymd_opt(2024, 6, 3));
        assert_eq!(on.get("date"), Some(&Value::from("2024-06-03")));
    }
}
