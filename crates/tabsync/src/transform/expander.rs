//! Row expander: fans comma-separated cells out into one row per value.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Cell, Record, Table};

/// Splits multi-value cells of one column into separate rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowExpander {
    /// Column whose comma-separated values are split.
    pub column: String,
    /// Numeric column divided evenly across the produced rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribute: Option<String>,
}

/// Result of an expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandResult {
    /// Expanded table, rows densely re-indexed from 0.
    pub table: Table,
    /// Source rows that were split.
    pub rows_split: usize,
    /// Rows added on top of the source row count.
    pub rows_added: usize,
}

impl RowExpander {
    /// Split on `column`.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            distribute: None,
        }
    }

    /// Also divide `column`'s numeric value across the split rows.
    pub fn with_distribute(mut self, column: impl Into<String>) -> Self {
        self.distribute = Some(column.into());
        self
    }

    /// Expand `table`. Rows without a comma in the target column, and tables
    /// without the target column, pass through unchanged.
    pub fn apply(&self, table: &Table) -> ExpandResult {
        if !table.has_column(&self.column) {
            return ExpandResult {
                table: table.clone(),
                rows_split: 0,
                rows_added: 0,
            };
        }

        let distribute = self
            .distribute
            .as_deref()
            .filter(|d| table.has_column(d));

        let mut out = Table::new(table.columns().to_vec());
        let mut rows_split = 0;

        for row in table.rows() {
            let parts = match row.get(&self.column) {
                Some(cell) if !cell.is_null() => split_parts(cell),
                _ => None,
            };

            match parts {
                Some(parts) if !parts.is_empty() => {
                    rows_split += 1;
                    let share = distribute.and_then(|d| {
                        row.get(d).and_then(|cell| divide(cell, parts.len()))
                    });
                    for part in parts {
                        out.push_record(self.split_row(row, part, distribute, share.as_ref()));
                    }
                }
                _ => out.push_record(row.clone()),
            }
        }

        let rows_added = out.row_count() - table.row_count();
        debug!(
            column = %self.column,
            rows_split,
            rows_added,
            "expanded comma-separated rows"
        );

        ExpandResult {
            table: out,
            rows_split,
            rows_added,
        }
    }

    fn split_row(
        &self,
        row: &Record,
        part: String,
        distribute: Option<&str>,
        share: Option<&Cell>,
    ) -> Record {
        let mut new_row = row.clone();
        new_row.insert(self.column.clone(), Cell::Text(part));
        if let (Some(column), Some(share)) = (distribute, share) {
            new_row.insert(column.to_string(), share.clone());
        }
        new_row
    }
}

/// Split on `column`, optionally distributing `distribute`, and return the table.
pub fn split_comma_separated(table: &Table, column: &str, distribute: Option<&str>) -> Table {
    let mut expander = RowExpander::new(column);
    if let Some(d) = distribute {
        expander = expander.with_distribute(d);
    }
    expander.apply(table).table
}

/// Trimmed comma-separated parts, or `None` when the cell holds no comma.
fn split_parts(cell: &Cell) -> Option<Vec<String>> {
    let text = cell.to_string();
    if !text.contains(',') {
        return None;
    }
    Some(text.split(',').map(|p| p.trim().to_string()).collect())
}

/// Even share of a numeric cell. Whole-number shares of integers stay integers.
fn divide(cell: &Cell, parts: usize) -> Option<Cell> {
    if parts == 0 {
        return None;
    }
    let value = cell.as_f64()?;
    let share = value / parts as f64;
    match cell {
        Cell::Integer(i) if i % parts as i64 == 0 => Some(Cell::Integer(i / parts as i64)),
        _ => Some(Cell::Real(share)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: Vec<Vec<Cell>>) -> Table {
        Table::from_rows(vec!["name".into(), "qty".into(), "owner".into()], rows)
    }

    #[test]
    fn test_fan_out_with_distribution() {
        let t = table(vec![vec![Cell::text("a, b, c"), Cell::Integer(9), Cell::text("kim")]]);
        let result = RowExpander::new("name").with_distribute("qty").apply(&t);

        assert_eq!(result.rows_split, 1);
        assert_eq!(result.rows_added, 2);
        let names: Vec<_> = result.table.column_values("name").cloned().collect();
        assert_eq!(names, vec![Cell::text("a"), Cell::text("b"), Cell::text("c")]);
        for row in result.table.rows() {
            assert_eq!(row.get("qty"), Some(&Cell::Integer(3)));
            assert_eq!(row.get("owner"), Some(&Cell::text("kim")));
        }
    }

    #[test]
    fn test_uneven_distribution_is_real() {
        let t = table(vec![vec![Cell::text("a,b"), Cell::Integer(5), Cell::Null]]);
        let out = split_comma_separated(&t, "name", Some("qty"));
        assert_eq!(out.get(0, "qty"), Some(&Cell::Real(2.5)));
        assert_eq!(out.get(1, "qty"), Some(&Cell::Real(2.5)));
    }

    #[test]
    fn test_split_rows_stay_in_place() {
        let t = table(vec![
            vec![Cell::text("first"), Cell::Integer(1), Cell::Null],
            vec![Cell::text("x,y"), Cell::Integer(2), Cell::Null],
            vec![Cell::text("last"), Cell::Integer(3), Cell::Null],
        ]);
        let out = split_comma_separated(&t, "name", None);

        let names: Vec<_> = out.column_values("name").cloned().collect();
        assert_eq!(
            names,
            vec![Cell::text("first"), Cell::text("x"), Cell::text("y"), Cell::text("last")]
        );
        // no distribute column: quantities copied unchanged
        assert_eq!(out.get(1, "qty"), Some(&Cell::Integer(2)));
        assert_eq!(out.get(2, "qty"), Some(&Cell::Integer(2)));
    }

    #[test]
    fn test_no_commas_is_identity() {
        let t = table(vec![
            vec![Cell::text("a"), Cell::Integer(1), Cell::Null],
            vec![Cell::Null, Cell::Integer(2), Cell::text("b")],
        ]);
        let result = RowExpander::new("name").with_distribute("qty").apply(&t);
        assert_eq!(result.table, t);
        assert_eq!(result.rows_split, 0);
    }

    #[test]
    fn test_missing_column_is_identity() {
        let t = table(vec![vec![Cell::text("a,b"), Cell::Integer(1), Cell::Null]]);
        assert_eq!(split_comma_separated(&t, "nope", None), t);
    }

    #[test]
    fn test_non_numeric_distribute_kept() {
        let t = table(vec![vec![Cell::text("a,b"), Cell::text("lots"), Cell::Null]]);
        let out = split_comma_separated(&t, "name", Some("qty"));
        assert_eq!(out.get(0, "qty"), Some(&Cell::text("lots")));
        assert_eq!(out.get(1, "qty"), Some(&Cell::text("lots")));
    }
}
