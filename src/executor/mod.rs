//! Test execution engine
//!
//! Provides sequential and parallel test execution capabilities.

mod parallel;
mod runner;
mod scheduler;
#[cfg(test)]
mod testing;

pub use runner::CaseRunner;
pub use scheduler::{ExecutionScheduler, SchedulePolicy};
