//! Auth sub-client — session inspection and explicit refresh.

use super::TokenState;
use crate::client::JqDataClient;
use crate::error::ApiError;

/// Sub-client for token operations.
pub struct Auth<'a> {
    pub(crate) client: &'a JqDataClient,
}

impl<'a> Auth<'a> {
    /// Current token state, without touching the network.
    pub async fn state(&self) -> TokenState {
        self.client.token.state().await
    }

    /// Check if a token is currently held.
    pub async fn is_authenticated(&self) -> bool {
        matches!(self.state().await, TokenState::Valid(_))
    }

    /// Make sure a token is held, fetching one if needed.
    pub async fn ensure(&self) -> Result<(), ApiError> {
        self.client.current_token().await.map(|_| ())
    }

    /// Drop the held token; the next request fetches a new one.
    pub async fn logout(&self) {
        self.client.token.clear().await;
    }
}
