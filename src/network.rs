//! Provider endpoint constants.

/// Default JQData HTTP API endpoint. Every method is a POST to this URL.
pub const DEFAULT_API_URL: &str = "https://dataapi.joinquant.com/v2/apis";

/// Time zone the provider uses for all dates and datetimes it returns.
pub const PROVIDER_TIME_ZONE: chrono_tz::Tz = chrono_tz::Asia::Shanghai;
