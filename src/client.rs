//! High-level client — `JqDataClient` with nested sub-client accessors.
//!
//! Each provider method family has its own sub-client in
//! `domain/<name>/client.rs`. This module keeps the builder, the token and
//! limiter state, and the request loop every sub-client goes through.

use crate::auth::client::Auth;
use crate::auth::{Credentials, TokenCell};
use crate::domain::bar::client::Bars;
use crate::domain::calendar::client::Calendar;
use crate::domain::futures::client::Futures;
use crate::domain::security::client::Securities;
use crate::error::{ApiError, IngestError, ParseError};
use crate::http::inband;
use crate::http::{RateLimitConfig, RateLimiter, RetryPolicy, Transport};
use crate::parse;

use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// Re-export sub-client types for convenience.
pub use crate::auth::client::Auth as AuthClient;
pub use crate::domain::bar::client::Bars as BarsClient;
pub use crate::domain::calendar::client::Calendar as CalendarClient;
pub use crate::domain::futures::client::Futures as FuturesClient;
pub use crate::domain::security::client::Securities as SecuritiesClient;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The primary entry point for provider calls.
///
/// Clones share the token, the rate limiter and the transport, so one logical
/// client can be handed to many concurrent tasks.
#[derive(Clone)]
pub struct JqDataClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Credentials,
    pub(crate) token: Arc<TokenCell>,
    pub(crate) limiter: RateLimiter,
    pub(crate) retry: RetryPolicy,
    pub(crate) timeout: Duration,
    pub(crate) time_zone: Tz,
}

impl JqDataClient {
    pub fn builder() -> JqDataClientBuilder {
        JqDataClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }

    pub fn calendar(&self) -> Calendar<'_> {
        Calendar { client: self }
    }

    pub fn securities(&self) -> Securities<'_> {
        Securities { client: self }
    }

    pub fn futures(&self) -> Futures<'_> {
        Futures { client: self }
    }

    pub fn bars(&self) -> Bars<'_> {
        Bars { client: self }
    }

    /// Time zone the provider's local datetimes are expressed in.
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Remaining query quota for the account (`get_query_count`).
    pub async fn query_count(&self) -> Result<u64, IngestError> {
        let text = self.request("get_query_count", Map::new()).await?;
        let raw = parse::parse_scalar(&text).unwrap_or_default();
        raw.parse::<u64>().map_err(|_| {
            ParseError::InvalidNumber {
                field: "query_count".to_string(),
                value: raw.to_string(),
            }
            .into()
        })
    }

    // ── Request loop ─────────────────────────────────────────────────────

    /// Execute one provider method and return the raw body text.
    ///
    /// A token-related failure invalidates the token and repeats the whole
    /// request once; a second token failure is an [`ApiError::Auth`]. Any
    /// other error is returned as-is.
    pub async fn request(&self, method: &str, params: Map<String, Value>) -> Result<String, ApiError> {
        let mut reauthenticated = false;

        loop {
            let token = self.current_token().await?;
            let body = request_body(&token, method, &params);

            match self.send_throttled(method, &body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_token_error() => {
                    self.token.invalidate(&token).await;
                    if reauthenticated {
                        return Err(ApiError::Auth(e.to_string()));
                    }
                    warn!(method, error = %e, "token rejected, re-authenticating");
                    reauthenticated = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Held token, fetching one first if needed.
    pub(crate) async fn current_token(&self) -> Result<String, ApiError> {
        self.token.get_or_fetch(|| self.fetch_token()).await
    }

    /// `get_current_token`. Not routed through the rate limiter.
    async fn fetch_token(&self) -> Result<String, ApiError> {
        debug!(account = %self.credentials.account, "fetching provider token");
        let text = self.post_with_timeout(&self.credentials.token_request()).await?;

        inband::classify(&text).map_err(|e| ApiError::Auth(e.to_string()))?;
        parse::parse_scalar(&text)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Auth("empty token response".to_string()))
    }

    /// Admit, send, classify; back off and resend while the provider throttles.
    async fn send_throttled(&self, method: &str, body: &Value) -> Result<String, ApiError> {
        let config = self.retry.config();
        let max_retries = config.as_ref().map_or(0, |c| c.max_retries);
        let mut attempt = 0;

        loop {
            let _permit = self.limiter.admit().await;
            let result = self
                .post_with_timeout(body)
                .await
                .and_then(|text| inband::classify(&text).map(|_| text));

            match (result, &config) {
                (Err(ApiError::RateLimited), Some(config)) if attempt < max_retries => {
                    let delay = config.delay_for_attempt(attempt);
                    debug!(
                        method,
                        attempt = attempt + 1,
                        max = max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "provider throttled request, backing off"
                    );
                    futures_timer::Delay::new(delay).await;
                    attempt += 1;
                }
                (Err(ApiError::RateLimited), Some(_)) => {
                    return Err(ApiError::MaxRetriesExceeded {
                        attempts: max_retries + 1,
                        last_error: ApiError::RateLimited.to_string(),
                    });
                }
                (result, _) => return result,
            }
        }
    }

    async fn post_with_timeout(&self, body: &Value) -> Result<String, ApiError> {
        match tokio::time::timeout(self.timeout, self.transport.post(body)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }
}

fn request_body(token: &str, method: &str, params: &Map<String, Value>) -> Value {
    let mut body = params.clone();
    body.insert("method".to_string(), Value::from(method));
    body.insert("token".to_string(), Value::from(token));
    Value::Object(body)
}

impl std::fmt::Debug for JqDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JqDataClient")
            .field("credentials", &self.credentials)
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct JqDataClientBuilder {
    url: String,
    credentials: Option<Credentials>,
    rate_limit: RateLimitConfig,
    retry: RetryPolicy,
    timeout: Duration,
    time_zone: Tz,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for JqDataClientBuilder {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_API_URL.to_string(),
            credentials: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            time_zone: crate::network::PROVIDER_TIME_ZONE,
            transport: None,
        }
    }
}

impl JqDataClientBuilder {
    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Replace the HTTP transport (tests, proxies, recorded sessions).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<JqDataClient, IngestError> {
        let credentials = self
            .credentials
            .ok_or_else(|| IngestError::Config("provider credentials are required".to_string()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(&self.url)?,
        };

        Ok(JqDataClient {
            transport,
            credentials,
            token: Arc::new(TokenCell::new()),
            limiter: RateLimiter::new(self.rate_limit),
            retry: self.retry,
            timeout: self.timeout,
            time_zone: self.time_zone,
        })
    }
}

#[cfg(feature = "http")]
fn default_transport(url: &str) -> Result<Arc<dyn Transport>, IngestError> {
    Ok(Arc::new(crate::http::HttpTransport::new(url)?))
}

#[cfg(not(feature = "http"))]
fn default_transport(_url: &str) -> Result<Arc<dyn Transport>, IngestError> {
    Err(IngestError::Config(
        "no transport configured and the `http` feature is disabled".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenState;
    use crate::http::RetryConfig;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned bodies and records every request body.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ApiError>>>,
        seen: Mutex<Vec<Value>>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn methods(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|b| b["method"].as_str().unwrap_or_default().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn post(&self, body: &Value) -> Result<String, ApiError> {
            self.seen.lock().unwrap().push(body.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Io("script exhausted".into())))
        }
    }

    fn client(transport: Arc<Scripted>) -> JqDataClient {
        JqDataClient::builder()
            .credentials(Credentials::new("acct", "pw"))
            .rate_limit(RateLimitConfig { burst: 1, per_second: 0 })
            .retry(RetryPolicy::None)
            .transport(transport)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_credentials() {
        let err = JqDataClient::builder()
            .transport(Scripted::new(&[]))
            .build()
            .unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[tokio::test]
    async fn test_logout_forces_new_token() {
        let transport = Scripted::new(&["tok-1", "100", "tok-2", "99"]);
        let client = client(transport.clone());

        assert_eq!(client.query_count().await.unwrap(), 100);
        client.auth().logout().await;
        assert_eq!(client.auth().state().await, TokenState::Absent);
        assert_eq!(client.query_count().await.unwrap(), 99);

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[1]["token"], "tok-1");
        assert_eq!(seen[3]["token"], "tok-2");
    }

    #[tokio::test]
    async fn test_token_fetched_lazily_once() {
        let transport = Scripted::new(&["tok-1", "100", "99"]);
        let client = client(transport.clone());

        assert!(!client.auth().is_authenticated().await);
        assert_eq!(client.query_count().await.unwrap(), 100);
        assert_eq!(client.query_count().await.unwrap(), 99);

        assert_eq!(
            transport.methods(),
            ["get_current_token", "get_query_count", "get_query_count"]
        );
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[1]["token"], "tok-1");
    }

    #[tokio::test]
    async fn test_expired_token_reauthenticates_exactly_once() {
        let transport = Scripted::new(&["tok-1", "error: token expired", "tok-2", "payload"]);
        let client = client(transport.clone());

        let text = client.request("get_query_count", Map::new()).await.unwrap();
        assert_eq!(text, "payload");
        assert_eq!(
            transport.methods(),
            ["get_current_token", "get_query_count", "get_current_token", "get_query_count"]
        );
        assert_eq!(client.auth().state().await, TokenState::Valid("tok-2".into()));
    }

    #[tokio::test]
    async fn test_second_token_failure_is_auth_error() {
        let transport = Scripted::new(&[
            "tok-1",
            "error: token expired",
            "tok-2",
            "error: token invalid",
            "never reached",
        ]);
        let client = client(transport.clone());

        let err = client.request("get_query_count", Map::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)), "got {err:?}");
        assert_eq!(transport.seen.lock().unwrap().len(), 4);
        assert_eq!(client.auth().state().await, TokenState::Absent);
    }

    #[tokio::test]
    async fn test_token_fetch_error_is_auth_error() {
        let transport = Scripted::new(&["error: wrong password"]);
        let client = client(transport.clone());

        let err = client.request("get_query_count", Map::new()).await.unwrap_err();
        match err {
            ApiError::Auth(message) => assert!(message.contains("wrong password")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(transport.methods(), ["get_current_token"]);
    }

    #[tokio::test]
    async fn test_other_provider_errors_pass_through() {
        let transport = Scripted::new(&["tok", "error: bad code"]);
        let client = client(transport.clone());

        let err = client.request("get_price", Map::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Provider(ref m) if m == "error: bad code"));
        assert_eq!(transport.methods().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_without_retry_policy_surfaces() {
        let transport = Scripted::new(&["tok", "Too Many Requests"]);
        let client = client(transport);

        let err = client.request("get_price", Map::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited));
    }

    #[tokio::test]
    async fn test_rate_limited_backs_off_then_succeeds() {
        let transport = Scripted::new(&["tok", "too many requests", "too many requests", "ok"]);
        let mut client = client(transport.clone());
        client.retry = RetryPolicy::Custom(RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_factor: 2.0,
            jitter: false,
        });

        let text = client.request("get_price", Map::new()).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(transport.methods().len(), 4);
    }

    #[tokio::test]
    async fn test_rate_limited_gives_up_after_max_retries() {
        let transport = Scripted::new(&["tok", "Too Many Requests", "Too Many Requests"]);
        let mut client = client(transport);
        client.retry = RetryPolicy::Custom(RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            jitter: false,
        });

        let err = client.request("get_price", Map::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::MaxRetriesExceeded { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_request_body_carries_method_token_and_params() {
        let transport = Scripted::new(&["tok", "ok"]);
        let client = client(transport.clone());

        let mut params = Map::new();
        params.insert("code".into(), Value::from("futures"));
        client.request("get_all_securities", params).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[1]["method"], "get_all_securities");
        assert_eq!(seen[1]["token"], "tok");
        assert_eq!(seen[1]["code"], "futures");
    }

    #[tokio::test]
    async fn test_slow_transport_times_out() {
        struct Stalled;

        #[async_trait]
        impl Transport for Stalled {
            async fn post(&self, _body: &Value) -> Result<String, ApiError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(String::new())
            }
        }

        let client = JqDataClient::builder()
            .credentials(Credentials::new("acct", "pw"))
            .timeout(Duration::from_millis(20))
            .transport(Arc::new(Stalled))
            .build()
            .unwrap();

        let err = client.auth().ensure().await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
    }
}
