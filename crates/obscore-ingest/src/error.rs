//! Error taxonomy.
//!
//! - [`ValidationError`]: a mandatory value is missing. Fatal for the run
//!   unless the configuration asks for invalid rows to be skipped.
//! - [`ConversionError`]: a value could not be read as a number/timestamp.
//!   Aggregation absorbs these and leaves the property out.
//! - [`ObsCoreError::Configuration`]: bad config file, column layout or
//!   output format. Raised before any row is processed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("row {line}: no obs_id value")]
    MissingObsId { line: usize },

    #[error("row {line} (obs_id {obs_id}): empty access_url")]
    MissingAccessUrl { line: usize, obs_id: String },

    #[error("observation {group_id}: {rows} row(s) named {access_name:?} carry no timestamp")]
    MissingTimestamp {
        group_id: String,
        access_name: String,
        rows: usize,
    },

    #[error("merge group {group} has no rows")]
    EmptyBundle { group: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("{value:?} is not a number")]
    NotNumeric { value: String },

    #[error("{value:?} is not an integer")]
    NotInteger { value: String },

    #[error("{value:?} is not a recognised timestamp")]
    NotTimestamp { value: String },

    #[error("cannot average an empty sequence")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ObsCoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("line {line}: expected {expected} columns, found {found}")]
    Parse {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ObsCoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ObsCoreError>;
