//! Runtime settings.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. legacy variables `JQDATA_USERNAME`, `JQDATA_PASSWORD`, `PGURL`
//! 3. an optional `jqdata.toml` (or the file passed to [`Settings::load_from`])
//! 4. `JQ_`-prefixed variables with `__` between sections, e.g.
//!    `JQ_PROVIDER__ACCOUNT`, `JQ_INGEST__CONCURRENCY`
//!
//! `.env` is loaded first, so any of the variables may live there.

use crate::auth::Credentials;
use crate::client::JqDataClient;
use crate::error::IngestError;
use crate::http::{RateLimitConfig, RetryConfig, RetryPolicy};
use crate::ingest::{FailurePolicy, IngestConfig};
use crate::network::{DEFAULT_API_URL, PROVIDER_TIME_ZONE};

use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "jqdata.toml";
pub const ENV_PREFIX: &str = "JQ";

/// Legacy variable names, honoured as low-priority defaults.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("JQDATA_USERNAME", "provider.account"),
    ("JQDATA_PASSWORD", "provider.secret"),
    ("PGURL", "database.url"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub url: String,
    pub account: String,
    pub secret: String,
    pub rate_limit: RateLimitConfig,
    pub timeout_secs: u64,
    pub retry: RetrySettings,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            account: String::new(),
            secret: String::new(),
            rate_limit: RateLimitConfig::default(),
            timeout_secs: 30,
            retry: RetrySettings::default(),
        }
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("url", &self.url)
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .field("rate_limit", &self.rate_limit)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Backoff on provider throttling. `max_retries = 0` turns it off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        if self.max_retries == 0 {
            return RetryPolicy::None;
        }
        RetryPolicy::Custom(RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..RetryConfig::default()
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Postgres URL. A `schema` query parameter selects the `search_path`.
    pub url: String,
    pub max_connections: u32,
    /// Session time zone set on every new connection.
    pub time_zone: Tz,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            time_zone: PROVIDER_TIME_ZONE,
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // URLs routinely embed a password.
        let target = self.target();
        let host = target
            .url
            .rsplit_once('@')
            .map_or(target.url.as_str(), |(_, host)| host);
        f.debug_struct("DatabaseSettings")
            .field("host", &host)
            .field("schema", &target.schema)
            .field("max_connections", &self.max_connections)
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

/// Driver URL with the `schema` parameter split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub url: String,
    pub schema: Option<String>,
}

impl DatabaseSettings {
    pub fn target(&self) -> ConnectTarget {
        let Some((base, query)) = self.url.split_once('?') else {
            return ConnectTarget {
                url: self.url.clone(),
                schema: None,
            };
        };

        let mut schema = None;
        let mut kept = Vec::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some(("schema", value)) if !value.is_empty() => schema = Some(value.to_string()),
                Some(("schema", _)) => {}
                _ => kept.push(pair),
            }
        }

        let url = if kept.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, kept.join("&"))
        };
        ConnectTarget { url, schema }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub max_window_days: u32,
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    /// Hour (provider-local) separating one session's minute bars from the next.
    pub session_cutoff_hour: u32,
    pub provider_time_zone: Tz,
}

impl Default for IngestSettings {
    fn default() -> Self {
        let defaults = IngestConfig::default();
        Self {
            max_window_days: defaults.max_window_days,
            concurrency: defaults.concurrency,
            failure_policy: defaults.failure_policy,
            session_cutoff_hour: 16,
            provider_time_zone: PROVIDER_TIME_ZONE,
        }
    }
}

impl IngestSettings {
    pub fn ingest_config(&self) -> Result<IngestConfig, IngestError> {
        let session_cutoff = NaiveTime::from_hms_opt(self.session_cutoff_hour, 0, 0).ok_or_else(|| {
            IngestError::Config(format!(
                "session_cutoff_hour must be 0-23, got {}",
                self.session_cutoff_hour
            ))
        })?;
        if self.concurrency == 0 {
            return Err(IngestError::Config("concurrency must be at least 1".into()));
        }
        Ok(IngestConfig {
            max_window_days: self.max_window_days,
            concurrency: self.concurrency,
            failure_policy: self.failure_policy,
            session_cutoff,
        })
    }
}

impl Settings {
    /// Load from `.env`, the legacy variables, `jqdata.toml` if present and
    /// `JQ_*` variables.
    pub fn load() -> Result<Self, IngestError> {
        Self::load_from(None)
    }

    /// Like [`Settings::load`] with an explicit settings file, which must exist.
    pub fn load_from(path: Option<&Path>) -> Result<Self, IngestError> {
        dotenvy::dotenv().ok();
        Self::build(path, std::env::vars().collect())
            .map_err(|e| IngestError::Config(e.to_string()))
    }

    /// Values stay strings until deserialization, so a secret such as
    /// `007007` keeps its leading zeros.
    fn build(path: Option<&Path>, env: Map<String, String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        for (var, key) in LEGACY_ENV {
            if let Some(value) = env.get(*var) {
                builder = builder.set_default(*key, value.as_str())?;
            }
        }

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env)),
            )
            .build()?
            .try_deserialize()
    }

    pub fn credentials(&self) -> Result<Credentials, IngestError> {
        if self.provider.account.is_empty() || self.provider.secret.is_empty() {
            return Err(IngestError::Config(
                "provider account and secret are required (JQ_PROVIDER__ACCOUNT / JQ_PROVIDER__SECRET or JQDATA_USERNAME / JQDATA_PASSWORD)".into(),
            ));
        }
        Ok(Credentials::new(
            self.provider.account.as_str(),
            self.provider.secret.as_str(),
        ))
    }

    /// Provider client over the default HTTP transport.
    pub fn client(&self) -> Result<JqDataClient, IngestError> {
        JqDataClient::builder()
            .url(&self.provider.url)
            .credentials(self.credentials()?)
            .rate_limit(self.provider.rate_limit)
            .retry(self.provider.retry.policy())
            .timeout(Duration::from_secs(self.provider.timeout_secs))
            .time_zone(self.ingest.provider_time_zone)
            .build()
    }

    pub fn require_database(&self) -> Result<&DatabaseSettings, IngestError> {
        if self.database.url.is_empty() {
            return Err(IngestError::Config(
                "database url is required (JQ_DATABASE__URL or PGURL)".into(),
            ));
        }
        Ok(&self.database)
    }
}
