//! CSV output: header row first, no index column.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::data::Table;
use crate::error::{Result, TabsyncError};

/// Write `table` as comma-separated text. Nulls become empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    if table.column_count() == 0 {
        return Ok(());
    }

    let mut writer = csv::WriterBuilder::new().from_writer(writer);
    writer.write_record(table.columns())?;

    for row in table.rows() {
        let fields = table
            .columns()
            .iter()
            .map(|c| row.get(c).map(|cell| cell.to_string()).unwrap_or_default());
        writer.write_record(fields)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write `table` as CSV to `path`, replacing any existing file.
pub fn write_csv_path(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| TabsyncError::io(path, e))?;
    write_csv(table, BufWriter::new(file))?;
    debug!(path = %path.display(), rows = table.row_count(), "wrote csv");
    Ok(())
}
