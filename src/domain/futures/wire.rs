//! Request parameters for `get_future_contracts` and `get_dominant_future`.

use crate::shared::format_date;
use chrono::NaiveDate;
use serde_json::{Map, Value};

pub const CONTRACTS_METHOD: &str = "get_future_contracts";
pub const DOMINANT_METHOD: &str = "get_dominant_future";

pub fn underlying_params(underlying: &str, date: NaiveDate) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("code".into(), Value::from(underlying));
    params.insert("date".into(), Value::from(format_date(date)));
    params
}
