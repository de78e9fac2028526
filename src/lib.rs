//! # jqdata-ingest
//!
//! A rate-limited client for the JQData HTTP API and an idempotent ingestion
//! pipeline that keeps futures listings and bars in PostgreSQL.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core** — Shared newtypes, response parsing, date chunking, domain records
//! 2. **Auth** — Credentials and the session token lifecycle
//! 3. **HTTP** — Transport, FIFO rate limiter, in-band error classification, backoff
//! 4. **Client** — `JqDataClient` with one sub-client per provider method family
//! 5. **Persistence** — `BarStore` with Postgres and in-memory backends
//! 6. **Orchestration** — `Ingestor` runs with bounded fan-out and per-item reports
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jqdata_ingest::prelude::*;
//!
//! let client = JqDataClient::builder()
//!     .credentials(Credentials::new("13800000000", "secret"))
//!     .build()?;
//!
//! let days = client.calendar().trade_days(start, end).await?;
//! let contracts = client.securities().futures_on(today).await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and provider text formats.
pub mod shared;

/// Response text parsing: scalars, lists and tables.
pub mod parse;

/// Calendar-range chunking for bounded query windows.
pub mod chunk;

/// Domain modules (vertical slices): records, wire parameters, conversions, sub-clients.
pub mod domain;

/// Unified error types.
pub mod error;

/// Provider endpoint constants.
pub mod network;

// ── Layer 2: Auth ────────────────────────────────────────────────────────────

/// Credentials and single-flight token refresh.
pub mod auth;

// ── Layer 3: HTTP ────────────────────────────────────────────────────────────

/// Transport, rate limiting, in-band classification and backoff.
pub mod http;

// ── Layer 4: Client ──────────────────────────────────────────────────────────

/// `JqDataClient` — the primary entry point.
pub mod client;

// ── Layer 5: Persistence ─────────────────────────────────────────────────────

/// Idempotent upserts for listings and bars.
pub mod store;

// ── Layer 6: Orchestration ───────────────────────────────────────────────────

/// Ingestion runs over the client and a store.
pub mod ingest;

/// Settings loaded from file and environment.
pub mod config;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{Code, FrequencyUnit, SecurityType};

    // Domain types
    pub use crate::domain::bar::{BarQuery, DailyBar, MinuteBar, Parsed, RejectedRow};
    pub use crate::domain::security::SecurityInfo;

    // Chunking
    pub use crate::chunk::{chunk_range, DateChunk};

    // Errors
    pub use crate::error::{ApiError, IngestError, IngestResult, ParseError, StoreError};

    // Network
    pub use crate::network::DEFAULT_API_URL;

    // Auth
    pub use crate::auth::{Credentials, TokenState};

    // HTTP
    pub use crate::http::{RateLimitConfig, RateLimiter, RetryConfig, RetryPolicy, Transport};

    // Client + sub-clients
    pub use crate::client::{
        AuthClient, BarsClient, CalendarClient, FuturesClient, JqDataClient, JqDataClientBuilder,
        SecuritiesClient,
    };

    // Persistence
    #[cfg(feature = "postgres")]
    pub use crate::store::PgStore;
    pub use crate::store::{BarStore, MemoryStore};

    // Orchestration
    pub use crate::ingest::{
        FailurePolicy, IngestConfig, Ingestor, ListScope, LogProgress, NoProgress, Progress,
        RunReport,
    };

    // Settings
    pub use crate::config::Settings;
}
