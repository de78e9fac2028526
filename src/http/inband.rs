//! In-band error detection.
//!
//! Every provider response is transport-successful; failures are written into
//! the body. Classification is a conservative substring match because the
//! provider has no structured error codes.

use crate::error::ApiError;
use regex::Regex;
use std::sync::LazyLock;

static ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"error.*").expect("static regex"));
static TOO_MANY_REQUESTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)too many requests").expect("static regex"));

/// Inspect a response body for in-band error markers.
///
/// An `error…` line wins over a throttling message when both are present.
pub fn classify(body: &str) -> Result<(), ApiError> {
    if let Some(m) = ERROR_LINE.find(body) {
        return Err(ApiError::Provider(m.as_str().trim_end().to_string()));
    }
    if TOO_MANY_REQUESTS.is_match(body) {
        return Err(ApiError::RateLimited);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_payload_is_ok() {
        assert!(classify("2024-01-02\n2024-01-03").is_ok());
        assert!(classify("").is_ok());
    }

    #[test]
    fn test_error_line_becomes_provider_error() {
        let err = classify("error: invalid code\nsecond line").unwrap_err();
        match err {
            ApiError::Provider(message) => assert_eq!(message, "error: invalid code"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_line_mid_body() {
        let err = classify("header\nerror: token expired").unwrap_err();
        assert!(err.is_token_error());
    }

    #[test]
    fn test_too_many_requests_any_case() {
        for body in ["Too Many Requests", "too many requests", "TOO MANY REQUESTS", "<h1>Too many Requests</h1>"] {
            assert!(matches!(classify(body), Err(ApiError::RateLimited)), "{body}");
        }
    }

    #[test]
    fn test_error_takes_precedence_over_throttling() {
        assert!(matches!(
            classify("error: too many requests"),
            Err(ApiError::Provider(_))
        ));
    }
}
