//! Result aggregation
//!
//! Collects per-case records as they complete and folds them into the run
//! summary.

use crate::models::{CaseRecord, RunSummary};

/// Collects completed case records as they arrive
#[derive(Clone, Debug, Default)]
pub struct ResultAggregator {
    records: Vec<CaseRecord>,
}

impl ResultAggregator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append one completed record
    pub fn push(&mut self, record: CaseRecord) {
        self.records.push(record);
    }

    pub fn completed(&self) -> usize {
        self.records.len()
    }

    /// Finalize into a run summary, keeping arrival order in `details`
    pub fn finish(self) -> RunSummary {
        fold(self.records)
    }
}

/// Fold a batch of records into a summary.
///
/// Counts partition the records by their success flag. Timing statistics
/// only cover records with an elapsed time and are all zero when none has one.
pub fn fold(records: impl IntoIterator<Item = CaseRecord>) -> RunSummary {
    let details: Vec<CaseRecord> = records.into_iter().collect();
    let successful = details.iter().filter(|r| r.success).count();
    let timings = TimingStats::from_records(&details);

    RunSummary {
        total: details.len(),
        successful,
        failed: details.len() - successful,
        details,
        total_time: timings.total,
        avg_time: timings.avg,
        min_time: timings.min,
        max_time: timings.max,
    }
}

/// Timing statistics over the records that have an elapsed time
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct TimingStats {
    total: f64,
    avg: f64,
    min: f64,
    max: f64,
}

impl TimingStats {
    fn from_records(records: &[CaseRecord]) -> Self {
        let times: Vec<f64> = records.iter().filter_map(|r| r.elapsed_secs).collect();
        if times.is_empty() {
            return Self::default();
        }

        let total: f64 = times.iter().sum();
        Self {
            total,
            avg: total / times.len() as f64,
            min: times.iter().copied().fold(f64::INFINITY, f64::min),
            max: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}
