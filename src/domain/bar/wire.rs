//! Request parameters and table columns for `get_price`.

use super::BarQuery;
use crate::shared::{format_date, format_datetime};
use serde_json::{Map, Value};

pub const METHOD: &str = "get_price";

pub const DAILY_COLUMNS: [&str; 13] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "money",
    "paused",
    "high_limit",
    "low_limit",
    "avg",
    "pre_close",
    "open_interest",
];

pub const MINUTE_COLUMNS: [&str; 8] = [
    "date",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "money",
    "open_interest",
];

/// Unset options are left out so the provider applies its own defaults.
pub fn price_params(query: &BarQuery) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("code".into(), Value::from(query.code.as_str()));
    params.insert("unit".into(), Value::from(query.unit.to_string()));

    if let Some(count) = query.count {
        params.insert("count".into(), Value::from(count));
    }
    if let Some(start) = query.start {
        params.insert("start_date".into(), Value::from(format_datetime(start)));
    }
    if let Some(end) = query.end {
        params.insert("end_date".into(), Value::from(format_datetime(end)));
    }
    if let Some(include_now) = query.include_now {
        params.insert("include_now".into(), Value::from(include_now));
    }
    if let Some(skip_paused) = query.skip_paused {
        params.insert("skip_paused".into(), Value::from(skip_paused));
    }
    if let Some(date) = query.fq_ref_date {
        params.insert("fq_ref_date".into(), Value::from(format_date(date)));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_count_query_params() {
        let params = price_params(&BarQuery::daily("AU2412.XSGE").count(1));
        assert_eq!(params.get("code"), Some(&Value::from("AU2412.XSGE")));
        assert_eq!(params.get("unit"), Some(&Value::from("1d")));
        assert_eq!(params.get("count"), Some(&Value::from(1)));
        assert!(!params.contains_key("start_date"));
        assert!(!params.contains_key("end_date"));
        assert!(!params.contains_key("include_now"));
    }

    #[test]
    fn test_window_query_params() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let query = BarQuery::minutes("AU2412.XSGE")
            .between(
                day.pred_opt().unwrap().and_hms_opt(16, 0, 0).unwrap(),
                day.and_hms_opt(16, 0, 0).unwrap(),
            )
            .skip_paused(false)
            .fq_ref_date(day);
        let params = price_params(&query);

        assert_eq!(params.get("unit"), Some(&Value::from("1m")));
        assert_eq!(params.get("start_date"), Some(&Value::from("2024-06-02 16:00:00")));
        assert_eq!(params.get("end_date"), Some(&Value::from("2024-06-03 16:00:00")));
        assert_eq!(params.get("skip_paused"), Some(&Value::from(false)));
        assert_eq!(params.get("fq_ref_date"), Some(&Value::from("2024-06-03")));
    }
}
