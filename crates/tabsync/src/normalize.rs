//! Best-effort column type normalization.
//!
//! Three rules, applied per column in this order of precedence:
//!
//! 1. A column named in the schema metadata is coerced to its declared type.
//! 2. A column whose name contains `date` or `time` is parsed as dates.
//! 3. Any other column whose non-null cells all parse as numbers becomes numeric.
//!
//! A cell that cannot be coerced becomes `Null`; normalization itself never fails.

use tracing::debug;

use crate::data::{Cell, ColumnSpec, DeclaredType, Table};

/// Per-column outcome of a normalization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Columns coerced by the schema metadata.
    pub declared: Vec<String>,
    /// Columns parsed as dates because of their name.
    pub dates: Vec<String>,
    /// Columns promoted from text to numbers.
    pub numeric: Vec<String>,
    /// Cells that held a value before and are `Null` after.
    pub cells_nulled: usize,
}

/// Applies the normalization rules to a table.
#[derive(Debug, Clone)]
pub struct Normalizer {
    schema: Vec<ColumnSpec>,
    dates_by_name: bool,
    infer_numeric: bool,
}

impl Normalizer {
    /// Create a normalizer with name-based date detection and numeric inference on.
    pub fn new() -> Self {
        Self {
            schema: Vec::new(),
            dates_by_name: true,
            infer_numeric: true,
        }
    }

    /// Add explicit column type annotations.
    pub fn with_schema(mut self, schema: Vec<ColumnSpec>) -> Self {
        self.schema = schema;
        self
    }

    /// Toggle the `date`/`time` column-name rule.
    pub fn with_dates_by_name(mut self, enabled: bool) -> Self {
        self.dates_by_name = enabled;
        self
    }

    /// Toggle text-to-number inference.
    pub fn with_numeric_inference(mut self, enabled: bool) -> Self {
        self.infer_numeric = enabled;
        self
    }

    /// Normalize `table` in place.
    pub fn normalize(&self, table: &mut Table) -> NormalizeReport {
        let mut report = NormalizeReport::default();
        let columns: Vec<String> = table.columns().to_vec();

        for column in &columns {
            if let Some(declared) = self.declared_type(column) {
                report.cells_nulled += coerce_column(table, column, |cell| match declared {
                    DeclaredType::Integer => cell.to_integer(),
                    DeclaredType::Real => cell.to_real(),
                    DeclaredType::Date => cell.to_date(),
                });
                report.declared.push(column.clone());
            } else if self.dates_by_name && is_temporal_name(column) {
                report.cells_nulled += coerce_column(table, column, Cell::to_date);
                report.dates.push(column.clone());
            } else if self.infer_numeric && is_numeric_text_column(table, column) {
                report.cells_nulled += coerce_column(table, column, Cell::to_number);
                report.numeric.push(column.clone());
            }
        }

        debug!(
            declared = report.declared.len(),
            dates = report.dates.len(),
            numeric = report.numeric.len(),
            cells_nulled = report.cells_nulled,
            "normalized table"
        );

        report
    }

    fn declared_type(&self, column: &str) -> Option<DeclaredType> {
        self.schema
            .iter()
            .find(|spec| spec.name == column)
            .and_then(ColumnSpec::declared_type)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Column-name rule for date detection.
pub fn is_temporal_name(column: &str) -> bool {
    let lower = column.to_lowercase();
    lower.contains("date") || lower.contains("time")
}

/// True when the column has text cells and every non-null cell reads as a number.
fn is_numeric_text_column(table: &Table, column: &str) -> bool {
    let mut saw_text = false;
    for cell in table.column_values(column) {
        match cell {
            Cell::Null | Cell::Integer(_) | Cell::Real(_) => {}
            Cell::Text(s) if crate::data::parse_number(s).is_some() => saw_text = true,
            _ => return false,
        }
    }
    saw_text
}

/// Apply `f` to every cell of `column`, returning how many values were lost.
fn coerce_column(table: &mut Table, column: &str, f: impl Fn(&Cell) -> Cell) -> usize {
    let mut nulled = 0;
    table.map_column(column, |cell| {
        let coerced = f(cell);
        if coerced.is_null() && !cell.is_null() {
            nulled += 1;
        }
        coerced
    });
    nulled
}
