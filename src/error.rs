//! Error types for loading and running the pipeline.
//!
//! Neither kind is fatal: a [`LoadError`] travels next to an empty dataset,
//! and a [`PipelineError`] describes a malformed request.

use serde::Serialize;
use thiserror::Error;

/// Why a dataset could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum LoadError {
    /// The remote source could not be reached or returned a bad status.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The bytes were fetched/read but could not be parsed into records.
    #[error("failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// The source descriptor names a format the loader does not know.
    #[error("unsupported source: {0}")]
    Unsupported(String),
}

/// A request the pipeline cannot honour.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Column was not found in the dataset.
    #[error("column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column used as a number holds something else.
    #[error("column '{0}' is not numeric")]
    NonNumeric(String),

    /// A required value is null.
    #[error("column '{column}' has no value at row {row}")]
    MissingValue { column: String, row: usize },

    /// Invalid configuration or request parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Short machine-readable code for front ends.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NonNumeric(_) => "NON_NUMERIC",
            Self::MissingValue { .. } => "MISSING_VALUE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let e = PipelineError::ColumnNotFound("hour".into());
        assert_eq!(e.to_string(), "column 'hour' not found in dataset");
        assert_eq!(e.error_code(), "COLUMN_NOT_FOUND");

        let e = LoadError::Fetch {
            url: "http://x".into(),
            reason: "refused".into(),
        };
        assert!(e.to_string().contains("http://x"));
    }
}
