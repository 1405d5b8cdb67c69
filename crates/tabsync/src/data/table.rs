//! In-memory table of dynamically typed records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::cell::Cell;
use super::types::ColumnType;

/// One row: column name to cell, in column order.
pub type Record = IndexMap<String, Cell>;

/// Ordered rows sharing one column set.
///
/// Every row carries every column; cells missing from the source are `Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Record>", into = "Vec<Record>")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from records; the column set is the union of their keys
    /// in first-seen order.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut table = Table::default();
        for record in records {
            table.push_record(record);
        }
        table
    }

    /// Build a table from positional rows. Short rows are padded with `Null`,
    /// long rows are truncated.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_iter();
                columns
                    .iter()
                    .map(|c| (c.clone(), cells.next().unwrap_or_default()))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order.
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns true if the table has the named column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get a specific cell.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Set a specific cell. Returns false when the row or column is absent.
    pub fn set(&mut self, row: usize, column: &str, value: Cell) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// All cells of a column, top to bottom.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.rows
            .iter()
            .map(move |r| r.get(column).unwrap_or(&Cell::Null))
    }

    /// Append a record, widening the column set if it brings new keys.
    pub fn push_record(&mut self, record: Record) {
        for key in record.keys() {
            if !self.columns.contains(key) {
                self.columns.push(key.clone());
                for row in &mut self.rows {
                    row.insert(key.clone(), Cell::Null);
                }
            }
        }

        let row = self
            .columns
            .iter()
            .map(|c| (c.clone(), record.get(c).cloned().unwrap_or_default()))
            .collect();
        self.rows.push(row);
    }

    /// Replace every cell of a column through `f`.
    pub fn map_column(&mut self, column: &str, mut f: impl FnMut(&Cell) -> Cell) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = f(cell);
            }
        }
    }

    /// Rename columns through `f`, keeping order. The new names must be unique.
    pub fn rename_columns(&mut self, mut f: impl FnMut(&str) -> String) {
        let renamed: Vec<String> = self.columns.iter().map(|c| f(c)).collect();
        for row in &mut self.rows {
            *row = self
                .columns
                .iter()
                .zip(&renamed)
                .map(|(old, new)| (new.clone(), row.swap_remove(old).unwrap_or_default()))
                .collect();
        }
        self.columns = renamed;
    }

    /// Type shared by the non-null cells of a column.
    pub fn column_type(&self, column: &str) -> ColumnType {
        let mut seen = ColumnType::Empty;
        for cell in self.column_values(column) {
            let ty = match cell {
                Cell::Null => continue,
                Cell::Bool(_) => ColumnType::Boolean,
                Cell::Integer(_) => ColumnType::Integer,
                Cell::Real(_) => ColumnType::Real,
                Cell::Date(_) => ColumnType::Date,
                Cell::Text(_) => return ColumnType::Text,
            };
            seen = match (seen, ty) {
                (ColumnType::Empty, ty) => ty,
                (a, b) if a == b => a,
                (a, b) if a.is_numeric() && b.is_numeric() => ColumnType::Real,
                _ => return ColumnType::Text,
            };
        }
        seen
    }

    /// Consume the table into its records.
    pub fn into_records(self) -> Vec<Record> {
        self.rows
    }
}

impl From<Vec<Record>> for Table {
    fn from(records: Vec<Record>) -> Self {
        Table::from_records(records)
    }
}

impl From<Table> for Vec<Record> {
    fn from(table: Table) -> Self {
        table.rows
    }
}
