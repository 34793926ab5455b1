//! Batch outcome model for a full reference-processing request.

use std::time::Duration;

use crate::models::record::ReferenceRecord;

/// Ordered results for one batch of references plus the wall-clock cost
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One record per non-empty input line, input order preserved
    pub records: Vec<ReferenceRecord>,

    /// Total processing time for the batch
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn new(records: Vec<ReferenceRecord>, elapsed: Duration) -> Self {
        Self { records, elapsed }
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn found(&self) -> usize {
        self.records.iter().filter(|r| r.is_found()).count()
    }

    pub fn not_found(&self) -> usize {
        self.total() - self.found()
    }

    /// Elapsed time rendered for API responses, e.g. "1.25s"
    pub fn elapsed_display(&self) -> String {
        format!("{:.2}s", self.elapsed.as_secs_f64())
    }
}
