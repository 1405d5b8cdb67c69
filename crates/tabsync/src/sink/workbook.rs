//! Excel output through `rust_xlsxwriter`: one sheet, header row, no index.

use std::path::Path;

use rust_xlsxwriter::Workbook;
use tracing::debug;

use crate::data::{format_date, Cell, Table};
use crate::error::{Result, TabsyncError};

/// Sheet name used when the caller does not pick one.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Write `table` as a single-sheet workbook. Dates are written as ISO-8601
/// text so they read back unchanged.
pub fn write_excel(table: &Table, path: impl AsRef<Path>, sheet_name: Option<&str>) -> Result<()> {
    let path = path.as_ref();
    let columns = u16::try_from(table.column_count()).map_err(|_| {
        TabsyncError::Persistence(format!(
            "{} columns do not fit in a worksheet",
            table.column_count()
        ))
    })?;

    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name.unwrap_or(DEFAULT_SHEET_NAME))?;

    for (col, name) in (0..columns).zip(table.columns()) {
        worksheet.write_string(0, col, name)?;
    }

    for (idx, row) in table.rows().iter().enumerate() {
        let row_num = u32::try_from(idx + 1).map_err(|_| {
            TabsyncError::Persistence(format!("{} rows do not fit in a worksheet", table.row_count()))
        })?;
        for (col, name) in (0..columns).zip(table.columns()) {
            match row.get(name).unwrap_or(&Cell::Null) {
                Cell::Null => {}
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                Cell::Integer(i) => {
                    worksheet.write_number(row_num, col, *i as f64)?;
                }
                Cell::Real(r) if r.is_finite() => {
                    worksheet.write_number(row_num, col, *r)?;
                }
                Cell::Real(_) => {}
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Cell::Date(d) => {
                    worksheet.write_string(row_num, col, format_date(d))?;
                }
            }
        }
    }

    workbook.save(path)?;
    debug!(path = %path.display(), rows = table.row_count(), "wrote workbook");
    Ok(())
}
