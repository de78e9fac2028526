//! Date-range chunking for the provider's bounded query window.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Provider limit on the span of one bar query, in calendar days.
pub const DEFAULT_MAX_WINDOW_DAYS: u32 = 30;

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateChunk {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateChunk {
    /// Number of calendar days covered, both ends included.
    pub fn len_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }
}

impl std::fmt::Display for DateChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Split `[start, end]` into the fewest chunks of at most `max_days` days.
///
/// Chunks are ordered and contiguous; only the last may be shorter than
/// `max_days`. `start == end` gives one single-day chunk, `start > end` gives
/// none, and a `max_days` of zero is treated as one.
pub fn chunk_range(start: NaiveDate, end: NaiveDate, max_days: u32) -> Vec<DateChunk> {
    let span = u64::from(max_days.max(1));
    let mut chunks = Vec::new();
    let mut current = start;

    while current <= end {
        let chunk_end = current
            .checked_add_days(Days::new(span - 1))
            .map_or(end, |d| d.min(end));
        chunks.push(DateChunk {
            start: current,
            end: chunk_end,
        });

        match chunk_end.checked_add_days(Days::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    chunks
}
