//! Low-level transport — one JSON POST to the provider endpoint.
//!
//! The transport returns the raw body text. It does not look at the text;
//! in-band classification, token handling and throttling live one layer up in
//! [`JqDataClient`](crate::client::JqDataClient).

use crate::error::ApiError;

use async_trait::async_trait;
use serde_json::Value;

/// Something that can deliver one provider call and hand back the body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, body: &Value) -> Result<String, ApiError>;
}

#[cfg(feature = "http")]
pub use reqwest_transport::HttpTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use super::*;
    use reqwest::Client;
    use std::time::Duration;

    /// `reqwest`-backed transport for the JQData endpoint.
    #[derive(Clone)]
    pub struct HttpTransport {
        url: String,
        client: Client,
    }

    impl HttpTransport {
        pub fn new(url: &str) -> Result<Self, ApiError> {
            let client = Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .build()?;

            Ok(Self {
                url: url.trim_end_matches('/').to_string(),
                client,
            })
        }

        pub fn url(&self) -> &str {
            &self.url
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn post(&self, body: &Value) -> Result<String, ApiError> {
            let resp = self.client.post(&self.url).json(body).send().await?;
            let status = resp.status();
            let text = resp.text().await?;

            if !status.is_success() {
                tracing::warn!(
                    status = status.as_u16(),
                    url = %self.url,
                    "provider answered with a non-success status"
                );
            }
            Ok(text)
        }
    }

    impl std::fmt::Debug for HttpTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("HttpTransport").field("url", &self.url).finish()
        }
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;

    #[test]
    fn test_url_trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("https://dataapi.joinquant.com/v2/apis/").unwrap();
        assert_eq!(transport.url(), "https://dataapi.joinquant.com/v2/apis");
        assert!(format!("{:?}", transport).contains("/v2/apis"));
    }
}
