//! Result aggregation and persistence
//!
//! Folds case records into the run summary and writes transcripts and the
//! summary file.

mod aggregate;
mod storage;

pub use aggregate::ResultAggregator;
pub use storage::ResultPersister;
