//! Timer utilities
//!
//! Pairs a monotonic clock for durations with the wall-clock start time
//! reported in records and transcripts.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

/// Timer for measuring one unit of work
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    started_at: DateTime<Local>,
    label: String,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            started_at: Local::now(),
            label: label.into(),
        }
    }

    /// Wall-clock time at which the timer started
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Wall-clock time now, never earlier than the start
    pub fn now(&self) -> DateTime<Local> {
        Local::now().max(self.started_at)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Stop timer and return elapsed time
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!("{}: {}ms", self.label, elapsed.as_millis());
        elapsed
    }
}
