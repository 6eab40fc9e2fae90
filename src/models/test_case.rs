//! Test case model
//!
//! One row of the test-case table: which agent to call and with what prompt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single unit of work loaded from the test-case table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Identifier, expected to be unique within a run (not enforced)
    pub id: String,

    /// Target agent identifier
    pub agent_id: String,

    /// Short human-readable label
    pub codename: String,

    /// Prompt sent to the agent
    pub prompt: String,
}

impl TestCase {
    #[cfg(test)]
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        codename: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            codename: codename.into(),
            prompt: prompt.into(),
        }
    }

    /// First `max_chars` characters of the prompt, for listings
    pub fn prompt_preview(&self, max_chars: usize) -> String {
        self.prompt.chars().take(max_chars).collect()
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Test case {}: {}", self.id, self.codename)
    }
}
