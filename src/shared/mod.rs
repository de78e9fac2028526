//! Shared newtypes and text formats used across all domain modules.
//!
//! These types are serialization-transparent: they serialize/deserialize
//! identically to the raw text the provider sends.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Date format used by the provider (`yyyy-MM-dd`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Datetime format used by the provider (`yyyy-MM-dd HH:mm:ss`).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// End date the provider reports for instruments that are still listed.
pub fn still_listed_sentinel() -> NaiveDate {
    NaiveDate::from_ymd_opt(2200, 1, 1).unwrap_or(NaiveDate::MAX)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_datetime(datetime: NaiveDateTime) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

// ─── Code ────────────────────────────────────────────────────────────────────

/// Provider instrument code (e.g. `"AU2412.XSGE"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Code(String);

impl Code {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Code {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Serialize for Code {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Code(s))
    }
}

// ─── SecurityType ────────────────────────────────────────────────────────────

/// Instrument class as named by `get_all_securities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityType {
    Stock,
    Futures,
    Index,
    Etf,
    Fja,
    Fjb,
    Fjm,
    Mmf,
    OpenFund,
    BondFund,
    StockFund,
    #[serde(rename = "QDII_fund")]
    QdiiFund,
    MoneyMarketFund,
    MixtureFund,
    Option,
}

impl SecurityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Futures => "futures",
            Self::Index => "index",
            Self::Etf => "etf",
            Self::Fja => "fja",
            Self::Fjb => "fjb",
            Self::Fjm => "fjm",
            Self::Mmf => "mmf",
            Self::OpenFund => "open_fund",
            Self::BondFund => "bond_fund",
            Self::StockFund => "stock_fund",
            Self::QdiiFund => "QDII_fund",
            Self::MoneyMarketFund => "money_market_fund",
            Self::MixtureFund => "mixture_fund",
            Self::Option => "option",
        }
    }
}

impl FromStr for SecurityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "stock" => Self::Stock,
            "futures" => Self::Futures,
            "index" => Self::Index,
            "etf" => Self::Etf,
            "fja" => Self::Fja,
            "fjb" => Self::Fjb,
            "fjm" => Self::Fjm,
            "mmf" => Self::Mmf,
            "open_fund" => Self::OpenFund,
            "bond_fund" => Self::BondFund,
            "stock_fund" => Self::StockFund,
            "QDII_fund" => Self::QdiiFund,
            "money_market_fund" => Self::MoneyMarketFund,
            "mixture_fund" => Self::MixtureFund,
            "option" => Self::Option,
            other => return Err(other.to_string()),
        };
        Ok(kind)
    }
}

impl std::fmt::Display for SecurityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── FrequencyUnit ───────────────────────────────────────────────────────────

/// Bar time unit accepted by `get_price`: `1m`–`120m`, `1d`, `1w`, `1M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyUnit {
    Minutes(u8),
    Day,
    Week,
    Month,
}

impl FrequencyUnit {
    pub const MINUTE: FrequencyUnit = FrequencyUnit::Minutes(1);

    /// Whether bars of this unit carry a time of day.
    pub fn is_intraday(&self) -> bool {
        matches!(self, Self::Minutes(_))
    }
}

impl Default for FrequencyUnit {
    fn default() -> Self {
        Self::MINUTE
    }
}

impl std::fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minutes(n) => write!(f, "{}m", n),
            Self::Day => write!(f, "1d"),
            Self::Week => write!(f, "1w"),
            Self::Month => write!(f, "1M"),
        }
    }
}

impl FromStr for FrequencyUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => return Ok(Self::Day),
            "1w" => return Ok(Self::Week),
            "1M" => return Ok(Self::Month),
            _ => {}
        }
        s.strip_suffix('m')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=120).contains(n))
            .map(Self::Minutes)
            .ok_or_else(|| format!("unsupported frequency unit: {}", s))
    }
}

impl Serialize for FrequencyUnit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FrequencyUnit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_serde() {
        let code = Code::from("AU2412.XSGE");
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"AU2412.XSGE\"");
        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }

    #[test]
    fn test_security_type_round_trips_provider_names() {
        assert_eq!("futures".parse::<SecurityType>().unwrap(), SecurityType::Futures);
        assert_eq!("QDII_fund".parse::<SecurityType>().unwrap(), SecurityType::QdiiFund);
        assert_eq!(SecurityType::OpenFund.as_str(), "open_fund");
        assert!("bitcoin".parse::<SecurityType>().is_err());
    }

    #[test]
    fn test_frequency_unit_parsing() {
        assert_eq!("1m".parse::<FrequencyUnit>().unwrap(), FrequencyUnit::Minutes(1));
        assert_eq!("120m".parse::<FrequencyUnit>().unwrap(), FrequencyUnit::Minutes(120));
        assert_eq!("1M".parse::<FrequencyUnit>().unwrap(), FrequencyUnit::Month);
        assert!("121m".parse::<FrequencyUnit>().is_err());
        assert!("0m".parse::<FrequencyUnit>().is_err());
        assert_eq!(FrequencyUnit::Minutes(5).to_string(), "5m");
        assert!(!FrequencyUnit::Day.is_intraday());
    }

    #[test]
    fn test_date_formats() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_date(date), "2024-03-05");
        let datetime = date.and_hms_opt(16, 0, 0).unwrap();
        assert_eq!(format_datetime(datetime), "2024-03-05 16:00:00");
    }
}
