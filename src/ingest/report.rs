//! Per-run outcome accounting.

use serde::Serialize;

/// What one successful work item did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    pub rows_written: u64,
    pub skipped_rows: usize,
}

/// One work item that failed, with the error rendered for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub stage: &'static str,
    pub item: String,
    pub error: String,
}

/// Totals for a run or one stage of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Work items that completed.
    pub succeeded: usize,
    pub rows_written: u64,
    /// Bars dropped by validation.
    pub skipped_rows: usize,
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    pub fn record(&mut self, outcome: ItemOutcome) {
        self.succeeded += 1;
        self.rows_written += outcome.rows_written;
        self.skipped_rows += outcome.skipped_rows;
    }

    pub fn merge(&mut self, other: RunReport) {
        self.succeeded += other.succeeded;
        self.rows_written += other.rows_written;
        self.skipped_rows += other.skipped_rows;
        self.failures.extend(other.failures);
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} items ok, {} failed, {} rows written, {} rows skipped",
            self.succeeded,
            self.failures.len(),
            self.rows_written,
            self.skipped_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_merge() {
        let mut a = RunReport::default();
        a.record(ItemOutcome { rows_written: 3, skipped_rows: 1 });
        a.record(ItemOutcome { rows_written: 2, skipped_rows: 0 });

        let mut b = RunReport::default();
        b.failures.push(ItemFailure {
            stage: "daily",
            item: "AU2412.XSGE".into(),
            error: "boom".into(),
        });

        a.merge(b);
        assert_eq!(a.succeeded, 2);
        assert_eq!(a.rows_written, 5);
        assert_eq!(a.skipped_rows, 1);
        assert!(!a.is_complete());
        assert_eq!(a.to_string(), "2 items ok, 1 failed, 5 rows written, 1 rows skipped");
    }
}
