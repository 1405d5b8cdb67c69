//! Data source abstraction and import provenance.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::format::Format;
use crate::snapshot::Snapshot;

/// Where a load reads its data from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// A file on disk.
    Path(&'a Path),
    /// An uploaded buffer; `name` is only used in messages and provenance.
    Bytes { name: &'a str, bytes: &'a [u8] },
    /// A snapshot that is already in memory.
    Snapshot(&'a Snapshot),
}

impl<'a> Source<'a> {
    /// A file source.
    pub fn path(path: &'a Path) -> Self {
        Source::Path(path)
    }

    /// An in-memory buffer source.
    pub fn bytes(name: &'a str, bytes: &'a [u8]) -> Self {
        Source::Bytes { name, bytes }
    }

    /// Human-readable label for messages and provenance.
    pub fn label(&self) -> String {
        match self {
            Source::Path(p) => p.display().to_string(),
            Source::Bytes { name, .. } => name.to_string(),
            Source::Snapshot(_) => "<snapshot>".to_string(),
        }
    }
}

/// Provenance of one import: which batch produced a set of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    /// SHA-256 of the source bytes, `sha256:<hex>`.
    pub id: String,
    /// Source label (file path or upload name).
    pub source: String,
    /// Declared source format.
    pub format: Format,
    /// Number of data rows loaded.
    pub row_count: usize,
    /// Number of columns loaded.
    pub column_count: usize,
    /// When the load ran.
    pub loaded_at: DateTime<Utc>,
}

impl ImportBatch {
    /// Describe a batch loaded from `bytes`.
    pub fn new(
        source: String,
        bytes: &[u8],
        format: Format,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);

        Self {
            id: format!("sha256:{:x}", hasher.finalize()),
            source,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}
