//! Error types for AAT Extract

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting one log file.
///
/// Every variant is fatal for the file being processed; nothing is retried or
/// downgraded.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Log file is empty (no header row)")]
    EmptyLog,

    #[error("Log file has no baseline row after the header")]
    MissingBaselineRow,

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row {row} has no cell for column {label} (position {position})")]
    MissingCell {
        row: usize,
        label: String,
        position: usize,
    },

    #[error("Row {row}, column {label}: expected an integer, found {value:?}")]
    NonNumeric {
        row: usize,
        label: String,
        value: String,
    },

    #[error("Row {row} does not belong to any category: {reason}")]
    MissingCategory { row: usize, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<ExtractError>,
    },
}

impl ExtractError {
    /// Attach the file path a failure occurred in.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        ExtractError::File {
            path: path.into(),
            source: Box::new(self),
        }
    }
}
