//! CLI command implementations.

pub mod convert;
pub mod export;
pub mod import;
pub mod list;
pub mod restore;

use std::path::Path;

use tabsync::Format;

/// Format named on the command line, or guessed from the file extension.
pub(crate) fn resolve_format(
    explicit: Option<Format>,
    path: &Path,
) -> Result<Format, Box<dyn std::error::Error>> {
    match explicit.or_else(|| Format::from_path(path)) {
        Some(format) => Ok(format),
        None => Err(format!(
            "Cannot tell the format of '{}'. Pass it explicitly (csv, excel, json, database).",
            path.display()
        )
        .into()),
    }
}
