//! Request parameters for `get_trade_days`.

use crate::shared::format_date;
use chrono::NaiveDate;
use serde_json::{Map, Value};

pub const METHOD: &str = "get_trade_days";

pub fn range_params(start: NaiveDate, end: NaiveDate) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("start_date".into(), Value::from(format_date(start)));
    params.insert("end_date".into(), Value::from(format_date(end)));
    params
}
