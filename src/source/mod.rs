//! Test case source
//!
//! Loads the fixed batch of test cases from a CSV table with the columns
//! `id, agent_id, codename, prompt`.

mod filter;

pub use filter::IdFilter;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

use crate::models::TestCase;

/// Test case table errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Test cases file '{0}' not found")]
    NotFound(PathBuf),

    #[error("Failed to open test cases file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading test cases from '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Outcome of loading the table: the cases that could be used, and the
/// error that prevented loading, if any
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub cases: Vec<TestCase>,
    pub error: Option<SourceError>,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Read every row of the table, in file order.
///
/// Any malformed row (missing column, bad quoting) fails the whole read.
pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<TestCase>, SourceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
        _ => SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(BufReader::new(file));

    reader
        .deserialize::<TestCase>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Load the batch for a run, keeping only rows whose id is in `filter`.
///
/// Never fails: a missing or unreadable table yields no cases plus the error,
/// so the caller can stop cleanly.
pub fn load(path: impl AsRef<Path>, filter: Option<&IdFilter>) -> LoadOutcome {
    let path = path.as_ref();
    match load_all(path) {
        Ok(rows) => {
            let cases: Vec<TestCase> = rows
                .into_iter()
                .filter(|case| filter.map_or(true, |f| f.contains(&case.id)))
                .collect();

            match filter {
                Some(filter) => info!(
                    "Loaded {} test cases (filtered by IDs: {}) from {}",
                    cases.len(),
                    filter,
                    path.display()
                ),
                None => info!("Loaded {} test cases from {}", cases.len(), path.display()),
            }

            LoadOutcome { cases, error: None }
        }
        Err(e) => {
            error!("{}", e);
            LoadOutcome {
                cases: Vec::new(),
                error: Some(e),
            }
        }
    }
}
