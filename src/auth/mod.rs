//! Authentication — provider credentials and the session token lifecycle.
//!
//! ## Token lifecycle
//!
//! The token is process-local and never persisted. It starts [`TokenState::Absent`],
//! is fetched lazily by the first request, and stays [`TokenState::Valid`] until
//! a response is classified as token-related. Refresh is single-flight: callers
//! that find the token absent queue on the same lock and reuse the one fetch.
//! Invalidation is compare-and-clear, so a caller holding a stale token cannot
//! wipe a token another caller has just refreshed.

pub mod client;

use crate::error::ApiError;

use async_lock::Mutex;
use serde_json::{json, Value};
use std::future::Future;

/// Provider account credentials.
///
/// `Debug` output never includes the secret.
#[derive(Clone)]
pub struct Credentials {
    pub account: String,
    secret: String,
}

impl Credentials {
    pub fn new(account: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            secret: secret.into(),
        }
    }

    /// Body of the `get_current_token` call.
    pub(crate) fn token_request(&self) -> Value {
        json!({
            "method": "get_current_token",
            "mob": self.account,
            "pwd": self.secret,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Explicit client-side token state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TokenState {
    #[default]
    Absent,
    Valid(String),
}

/// Token holder with single-flight refresh.
#[derive(Debug, Default)]
pub struct TokenCell {
    state: Mutex<TokenState>,
}

impl TokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> TokenState {
        self.state.lock().await.clone()
    }

    /// Return the held token, or run `fetch` to obtain one.
    ///
    /// The lock is held across `fetch`, so concurrent callers wait for the
    /// in-flight refresh instead of starting their own.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        let mut state = self.state.lock().await;
        if let TokenState::Valid(token) = &*state {
            return Ok(token.clone());
        }

        let token = fetch().await?;
        *state = TokenState::Valid(token.clone());
        Ok(token)
    }

    /// Clear the token if it is still the one the provider rejected.
    ///
    /// Returns `true` when the state changed.
    pub async fn invalidate(&self, rejected: &str) -> bool {
        let mut state = self.state.lock().await;
        match &*state {
            TokenState::Valid(token) if token == rejected => {
                *state = TokenState::Absent;
                true
            }
            _ => false,
        }
    }

    /// Drop whatever token is held.
    pub async fn clear(&self) {
        *self.state.lock().await = TokenState::Absent;
    }
}
