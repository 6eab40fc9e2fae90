//! Test case ID filter
//!
//! Parses selection expressions such as `"1,3,5-8"` into a set of literal ids.

use std::collections::BTreeSet;
use tracing::warn;

/// Widest range a single token may expand to
const MAX_RANGE_SPAN: i64 = 100_000;

/// Set of test case ids selected for a run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdFilter {
    ids: BTreeSet<String>,
}

impl IdFilter {
    /// Parse a comma-separated list of ids and inclusive `start-end` ranges.
    ///
    /// Returns `None` for a blank expression, meaning "no filter". A token is a
    /// range only when it contains a dash that is neither leading nor trailing;
    /// `"-5"` and `"5-"` are kept as literal ids. Malformed ranges such as
    /// `"a-b"` and ranges wider than `MAX_RANGE_SPAN` are logged and dropped.
    pub fn parse(expr: &str) -> Option<Self> {
        if expr.trim().is_empty() {
            return None;
        }

        let mut ids = Vec::new();
        for token in expr.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if is_range_token(token) {
                match parse_range(token) {
                    Some((start, end)) if end.saturating_sub(start) >= MAX_RANGE_SPAN => {
                        warn!("Range {} spans more than {} ids, ignoring it", token, MAX_RANGE_SPAN)
                    }
                    Some((start, end)) => ids.extend((start..=end).map(|n| n.to_string())),
                    None => warn!("Invalid range format: {}", token),
                }
            } else {
                ids.push(token.to_string());
            }
        }

        Some(Self::from_ids(ids))
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl std::fmt::Display for IdFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.iter().collect();
        write!(f, "{}", ids.join(","))
    }
}

fn is_range_token(token: &str) -> bool {
    token.contains('-') && !token.starts_with('-') && !token.ends_with('-')
}

fn parse_range(token: &str) -> Option<(i64, i64)> {
    let (start, end) = token.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    Some((start, end))
}
