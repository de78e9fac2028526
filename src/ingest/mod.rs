//! Orchestration — which instruments to fetch, over which windows, and
//! where the results go.
//!
//! Every run is a set of independent work items (one instrument, or one
//! instrument and date chunk) polled concurrently on the caller's task with a
//! bounded width. The client's rate limiter throttles outbound calls; the
//! width only bounds how many items are in flight. Items succeed or fail on
//! their own and are tallied in a [`RunReport`]. Rows already upserted stay
//! committed whatever happens to their siblings.

mod progress;
mod report;

pub use progress::{LogProgress, NoProgress, Progress};
pub use report::{ItemFailure, ItemOutcome, RunReport};

use crate::chunk::{chunk_range, DateChunk, DEFAULT_MAX_WINDOW_DAYS};
use crate::client::JqDataClient;
use crate::domain::bar::BarQuery;
use crate::error::{IngestError, IngestResult};
use crate::shared::Code;
use crate::store::BarStore;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DAILY_STAGE: &str = "daily_bars";
const MINUTE_STAGE: &str = "minute_bars";
const BACKFILL_STAGE: &str = "daily_backfill";

/// What a run does when a work item fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failure and return it.
    FailFast,
    /// Record the failure and keep going.
    #[default]
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Widest date span of one bar query.
    pub max_window_days: u32,
    /// Work items in flight at once.
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    /// Provider-local time that closes one session's minute window and opens
    /// the next.
    pub session_cutoff: NaiveTime,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
            concurrency: 16,
            failure_policy: FailurePolicy::default(),
            session_cutoff: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Which instrument listing to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Every contract ever listed.
    All,
    /// Contracts listed on one day.
    On(NaiveDate),
}

/// One code and one date chunk of a backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BackfillItem {
    code: Code,
    chunk: DateChunk,
}

impl std::fmt::Display for BackfillItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.chunk)
    }
}

pub struct Ingestor {
    client: JqDataClient,
    store: Arc<dyn BarStore>,
    config: IngestConfig,
    progress: Arc<dyn Progress>,
    cancel: CancellationToken,
}

impl Ingestor {
    pub fn new(client: JqDataClient, store: Arc<dyn BarStore>, config: IngestConfig) -> Self {
        Self {
            client,
            store,
            config,
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    /// Runs stop with [`IngestError::Cancelled`] once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    // ── Single steps ─────────────────────────────────────────────────────

    pub async fn is_trade_day(&self, date: NaiveDate) -> IngestResult<bool> {
        self.cancellable(self.client.calendar().is_trade_day(date))
            .await
    }

    /// Fetch a futures listing and upsert it. Returns the number of contracts.
    pub async fn sync_securities(&self, scope: ListScope) -> IngestResult<usize> {
        let securities = self.client.securities();
        let infos = match scope {
            ListScope::All => self.cancellable(securities.all_futures()).await?,
            ListScope::On(date) => self.cancellable(securities.futures_on(date)).await?,
        };
        let written = self.store.upsert_securities(&infos).await?;
        info!(?scope, contracts = infos.len(), rows = written, "synced futures listing");
        Ok(infos.len())
    }

    /// Latest daily bar up to `date` for every contract active on `date`.
    pub async fn sync_daily_bars_on(&self, date: NaiveDate) -> IngestResult<RunReport> {
        let codes = self.codes_active_on(date).await?;
        let end = date.and_time(self.config.session_cutoff);

        self.fan_out(DAILY_STAGE, codes, |code| {
            self.load_daily(BarQuery::daily(code).count(1).end(end))
        })
        .await
    }

    /// One-minute bars of the session ending on `date`: from the previous
    /// day's cutoff to `date`'s cutoff, which covers the night session.
    pub async fn sync_minute_bars_on(&self, date: NaiveDate) -> IngestResult<RunReport> {
        let codes = self.codes_active_on(date).await?;
        let cutoff = self.config.session_cutoff;
        let start = date
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| IngestError::Validation(format!("no day before {}", date)))?
            .and_time(cutoff);
        let end = date.and_time(cutoff);

        self.fan_out(MINUTE_STAGE, codes, |code| {
            self.load_minutes(BarQuery::minutes(code).between(start, end))
        })
        .await
    }

    /// Full daily history of every contract still listed on Jan 1 of
    /// `today.year() - past_years`, each span cut at `today` and split into
    /// provider-sized windows.
    pub async fn backfill_daily_bars(
        &self,
        past_years: u32,
        today: NaiveDate,
    ) -> IngestResult<RunReport> {
        let since = i32::try_from(past_years)
            .ok()
            .and_then(|years| today.year().checked_sub(years))
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .ok_or_else(|| IngestError::Validation(format!("cannot go back {} years", past_years)))?;

        let infos = self.store.securities_listed_since(since).await?;
        let items: Vec<BackfillItem> = infos
            .iter()
            .filter_map(|info| info.span_until(today).map(|span| (&info.code, span)))
            .flat_map(|(code, (start, end))| {
                chunk_range(start, end, self.config.max_window_days)
                    .into_iter()
                    .map(move |chunk| BackfillItem {
                        code: code.clone(),
                        chunk,
                    })
            })
            .collect();
        info!(%since, contracts = infos.len(), items = items.len(), "planned daily backfill");

        let cutoff = self.config.session_cutoff;
        self.fan_out(BACKFILL_STAGE, items, |item| {
            self.load_daily(BarQuery::daily(item.code).between(
                item.chunk.start.and_time(NaiveTime::MIN),
                item.chunk.end.and_time(cutoff),
            ))
        })
        .await
    }

    // ── Runs ─────────────────────────────────────────────────────────────

    /// End-of-day job: listing, daily bars and minute bars for `today`.
    /// Does nothing on a non-trading day.
    pub async fn run_daily(&self, today: NaiveDate) -> IngestResult<RunReport> {
        if !self.is_trade_day(today).await? {
            info!(%today, "not a trading day, nothing to do");
            return Ok(RunReport::default());
        }

        self.sync_securities(ListScope::On(today)).await?;
        let mut report = self.sync_daily_bars_on(today).await?;
        report.merge(self.sync_minute_bars_on(today).await?);

        info!(%today, %report, "daily run finished");
        Ok(report)
    }

    /// Full listing, then the daily-bar backfill.
    pub async fn run_full(&self, past_years: u32, today: NaiveDate) -> IngestResult<RunReport> {
        self.sync_securities(ListScope::All).await?;
        let report = self.backfill_daily_bars(past_years, today).await?;

        info!(%today, past_years, %report, "full run finished");
        Ok(report)
    }

    // ── Internals ────────────────────────────────────────────────────────

    async fn codes_active_on(&self, date: NaiveDate) -> IngestResult<Vec<Code>> {
        Ok(self
            .store
            .active_securities(date)
            .await?
            .into_iter()
            .map(|info| info.code)
            .collect())
    }

    async fn load_daily(&self, query: BarQuery) -> IngestResult<ItemOutcome> {
        let parsed = self.client.bars().daily(&query).await?;
        let rows_written = self.store.upsert_daily_bars(&parsed.records).await?;
        Ok(ItemOutcome {
            rows_written,
            skipped_rows: parsed.rejected.len(),
        })
    }

    async fn load_minutes(&self, query: BarQuery) -> IngestResult<ItemOutcome> {
        let parsed = self.client.bars().minutes(&query).await?;
        let rows_written = self.store.upsert_minute_bars(&parsed.records).await?;
        Ok(ItemOutcome {
            rows_written,
            skipped_rows: parsed.rejected.len(),
        })
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = IngestResult<T>>) -> IngestResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(IngestError::Cancelled),
            result = fut => result,
        }
    }

    /// Run `work` over `items`, at most `concurrency` at a time.
    async fn fan_out<I, F, Fut>(
        &self,
        stage: &'static str,
        items: Vec<I>,
        work: F,
    ) -> IngestResult<RunReport>
    where
        I: std::fmt::Display,
        F: Fn(I) -> Fut,
        Fut: Future<Output = IngestResult<ItemOutcome>>,
    {
        if self.cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        self.progress.start(stage, items.len());
        let work = &work;
        let mut pending = stream::iter(items)
            .map(|item| async move {
                let label = item.to_string();
                (label, work(item).await)
            })
            .buffer_unordered(self.config.concurrency.max(1));

        let mut report = RunReport::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.progress.finish(stage);
                    warn!(stage, %report, "run cancelled");
                    return Err(IngestError::Cancelled);
                }
                next = pending.next() => next,
            };
            let Some((item, result)) = next else {
                break;
            };

            self.progress.advance(stage);
            match result {
                Ok(outcome) => report.record(outcome),
                Err(error) => {
                    warn!(stage, item = %item, error = %error, "work item failed");
                    if self.config.failure_policy == FailurePolicy::FailFast {
                        self.progress.finish(stage);
                        return Err(error);
                    }
                    report.failures.push(ItemFailure {
                        stage,
                        item,
                        error: error.to_string(),
                    });
                }
            }
        }

        self.progress.finish(stage);
        info!(stage, %report, "stage finished");
        Ok(report)
    }
}
