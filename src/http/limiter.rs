//! Admission gate for outbound provider calls.
//!
//! A token bucket (`governor`) decides *when* a call may start; a fair async
//! mutex in front of it makes admission first-come, first-served. Waiters are
//! never dropped, and nothing here knows about the provider's own throttling
//! signal.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::trace;

type Bucket = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Burst capacity and steady refill rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls that may start immediately when the bucket is full.
    pub burst: u32,
    /// Permits replenished per second. Zero disables throttling.
    pub per_second: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 1,
            per_second: 10,
        }
    }
}

/// Proof of admission for one outbound call.
///
/// Dropping it returns nothing to the bucket: a permit is spent whether the
/// call succeeds or fails.
#[derive(Debug)]
#[must_use]
pub struct Permit(());

/// FIFO rate limiter shared by every caller of one client.
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Option<Arc<Bucket>>,
    queue: Arc<Mutex<()>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let bucket = NonZeroU32::new(config.per_second).map(|rate| {
            let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
            Arc::new(GovernorRateLimiter::direct(
                Quota::per_second(rate).allow_burst(burst),
            ))
        });

        Self {
            bucket,
            queue: Arc::new(Mutex::new(())),
            config,
        }
    }

    /// A limiter that admits every call immediately.
    pub fn unlimited() -> Self {
        Self::new(RateLimitConfig {
            burst: 1,
            per_second: 0,
        })
    }

    /// Wait for this caller's turn, then for a permit.
    pub async fn admit(&self) -> Permit {
        if let Some(bucket) = &self.bucket {
            let _turn = self.queue.lock().await;
            bucket.until_ready().await;
            trace!("rate limiter admitted call");
        }
        Permit(())
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.bucket.is_some()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish()
    }
}
