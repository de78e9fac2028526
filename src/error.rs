//! Unified error types for the client, parser, store and orchestrator.

use thiserror::Error;

/// Top-level crate error.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run cancelled")]
    Cancelled,
}

/// Errors raised while talking to the data provider.
///
/// The provider answers HTTP 200 even when a call fails, so everything except
/// `Transport` and `Timeout` is derived from the response body.
#[derive(Error, Debug)]
pub enum ApiError {
    #[cfg(feature = "http")]
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Transport failure: {0}")]
    Io(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Timeout")]
    Timeout,

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl ApiError {
    /// Whether the provider rejected the request because of the token.
    pub fn is_token_error(&self) -> bool {
        match self {
            ApiError::Provider(message) | ApiError::Auth(message) => message.contains("token"),
            _ => false,
        }
    }
}

/// Errors raised while turning response text into typed records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed table: {0}")]
    Malformed(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Invalid number in '{field}': {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("Invalid flag in '{field}': {value:?}")]
    InvalidFlag { field: String, value: String },

    #[error("Invalid date in '{field}': {value:?}")]
    InvalidDate { field: String, value: String },

    #[error("Invalid datetime in '{field}': {value:?}")]
    InvalidDateTime { field: String, value: String },

    #[error("Unknown security type: {0}")]
    UnknownSecurityType(String),
}

/// Persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;
