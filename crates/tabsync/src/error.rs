//! Error types for the tabsync library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tabsync operations.
#[derive(Debug, Error)]
pub enum TabsyncError {
    /// The source could not be parsed as the declared format.
    #[error("Unreadable source '{source_name}': {message}")]
    UnreadableSource {
        source_name: String,
        message: String,
    },

    /// A snapshot or backup was requested that does not exist.
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Incoming data handed to the merger is not a record sequence.
    #[error("Invalid merge input: {0}")]
    InvalidMergeInput(String),

    /// Conversion requested for a format that is not implemented.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the relational store.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Error writing a workbook.
    #[error("Excel error: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    /// Destination table already exists and the policy forbids touching it.
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// Snapshot files could not be written or read back.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Empty file or no data to work with.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Stable classification of [`TabsyncError`] for callers that present errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnreadableSource,
    SnapshotNotFound,
    InvalidMergeInput,
    UnsupportedFormat,
    Io,
    Storage,
    Other,
}

impl TabsyncError {
    /// Build an [`TabsyncError::UnreadableSource`] from any displayable cause.
    pub fn unreadable(source_name: impl Into<String>, message: impl ToString) -> Self {
        TabsyncError::UnreadableSource {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TabsyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TabsyncError::UnreadableSource { .. } | TabsyncError::Csv(_) => {
                ErrorKind::UnreadableSource
            }
            TabsyncError::SnapshotNotFound(_) => ErrorKind::SnapshotNotFound,
            TabsyncError::InvalidMergeInput(_) => ErrorKind::InvalidMergeInput,
            TabsyncError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            TabsyncError::Io { .. } => ErrorKind::Io,
            TabsyncError::Storage(_) | TabsyncError::TableExists(_) => ErrorKind::Storage,
            _ => ErrorKind::Other,
        }
    }
}

/// Result type alias for tabsync operations.
pub type Result<T> = std::result::Result<T, TabsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            TabsyncError::unreadable("a.csv", "bad").kind(),
            ErrorKind::UnreadableSource
        );
        assert_eq!(
            TabsyncError::SnapshotNotFound("x".into()).kind(),
            ErrorKind::SnapshotNotFound
        );
        assert_eq!(
            TabsyncError::Config("nope".into()).kind(),
            ErrorKind::Other
        );
    }

    #[test]
    fn test_unreadable_message() {
        let err = TabsyncError::unreadable("book.xlsx", "missing sheet 'Q3'");
        assert_eq!(
            err.to_string(),
            "Unreadable source 'book.xlsx': missing sheet 'Q3'"
        );
    }
}
