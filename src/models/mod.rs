//! Data models for agent test runs
//!
//! This module contains all data structures shared across the application.

mod test_case;
mod test_result;

pub use test_case::TestCase;
pub use test_result::{CaseRecord, CaseState, InvocationResult, RunSummary};
