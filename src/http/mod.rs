//! HTTP layer — transport, rate limiting, in-band error classification, backoff.

pub mod client;
pub mod inband;
pub mod limiter;
pub mod retry;

#[cfg(feature = "http")]
pub use client::HttpTransport;
pub use client::Transport;
pub use limiter::{Permit, RateLimitConfig, RateLimiter};
pub use retry::{RetryConfig, RetryPolicy};
