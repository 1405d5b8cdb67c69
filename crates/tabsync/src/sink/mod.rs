//! Format sinks.
//!
//! Serialize a [`Table`] as CSV, a single-sheet Excel workbook, or a JSON
//! snapshot envelope. Relational output lives in [`crate::store`].

mod delimited;
mod json;
mod workbook;

use std::path::Path;

pub use delimited::{write_csv, write_csv_path};
pub(crate) use json::write_envelope;
pub use json::{to_json_string, write_json};
pub use workbook::{write_excel, DEFAULT_SHEET_NAME};

use crate::data::Table;
use crate::error::{Result, TabsyncError};
use crate::format::Format;

/// Write `table` to a file in one of the file formats.
pub fn write_path(table: &Table, path: impl AsRef<Path>, format: Format) -> Result<()> {
    let path = path.as_ref();
    match format {
        Format::Csv => write_csv_path(table, path),
        Format::Excel => write_excel(table, path, None),
        Format::Json => write_json(table, path, None),
        Format::Database => Err(TabsyncError::UnsupportedFormat(
            "database output needs a relational store, not a file path".to_string(),
        )),
    }
}
