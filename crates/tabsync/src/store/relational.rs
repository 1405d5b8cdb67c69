//! SQLite-backed table storage.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{format_date, Cell, ColumnSpec, Table};
use crate::error::{Result, TabsyncError};
use crate::normalize::Normalizer;

/// What to do when the destination table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    /// Drop and recreate the table.
    Replace,
    /// Insert into the existing table.
    Append,
    /// Refuse to touch it.
    #[default]
    Fail,
}

impl FromStr for IfExists {
    type Err = TabsyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            "fail" => Ok(IfExists::Fail),
            other => Err(TabsyncError::Config(format!(
                "unknown if-exists policy '{}' (use replace, append or fail)",
                other
            ))),
        }
    }
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfExists::Replace => write!(f, "replace"),
            IfExists::Append => write!(f, "append"),
            IfExists::Fail => write!(f, "fail"),
        }
    }
}

/// One SQLite database holding the tables of a logical domain.
///
/// Callers serialize access; the handle holds a single connection.
pub struct RelationalStore {
    conn: Connection,
    label: String,
}

impl RelationalStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened relational store");
        Ok(Self {
            conn,
            label: path.display().to_string(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            label: ":memory:".to_string(),
        })
    }

    /// Where this store lives, for messages and metadata.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Write `table` into `dest` and return the destination's row count
    /// afterwards. Column affinities follow the cell types of each column.
    pub fn write_table(&mut self, table: &Table, dest: &str, if_exists: IfExists) -> Result<usize> {
        if table.column_count() == 0 {
            return Err(TabsyncError::EmptyData(format!(
                "no columns to write into table '{}'",
                dest
            )));
        }

        let exists = self.table_exists(dest)?;
        if exists && if_exists == IfExists::Fail {
            return Err(TabsyncError::TableExists(dest.to_string()));
        }

        let tx = self.conn.transaction()?;

        if exists && if_exists == IfExists::Replace {
            tx.execute(&format!("DROP TABLE {}", quote_ident(dest)), [])?;
        }
        if !exists || if_exists == IfExists::Replace {
            tx.execute(&create_statement(table, dest), [])?;
        }

        {
            let columns: Vec<String> = table.columns().iter().map(|c| quote_ident(c)).collect();
            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(dest),
                columns.join(", "),
                placeholders.join(", ")
            ))?;

            for row in table.rows() {
                let values = table
                    .columns()
                    .iter()
                    .map(|c| row.get(c).unwrap_or(&Cell::Null));
                stmt.execute(params_from_iter(values))?;
            }
        }

        tx.commit()?;

        let count = self.row_count(dest)?;
        debug!(
            table = dest,
            policy = %if_exists,
            written = table.row_count(),
            total = count,
            "wrote table"
        );
        Ok(count)
    }

    /// Read a whole table. Columns declared as integer, real or date-like are
    /// coerced back to those types.
    pub fn read_table(&self, name: &str) -> Result<Table> {
        let mut table = self.read_query(&format!("SELECT * FROM {}", quote_ident(name)))?;
        let schema = self.table_info(name)?;
        Normalizer::new()
            .with_schema(schema)
            .with_dates_by_name(false)
            .with_numeric_inference(false)
            .normalize(&mut table);
        Ok(table)
    }

    /// Run an arbitrary query and collect its rows.
    pub fn read_query(&self, sql: &str) -> Result<Table> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut query = stmt.query([])?;
        while let Some(row) = query.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell_from_sql(row.get_ref(i)?));
            }
            rows.push(cells);
        }

        Ok(Table::from_rows(columns, rows))
    }

    /// Declared columns of table `name`, in order. Empty when the table is missing.
    pub fn table_info(&self, name: &str) -> Result<Vec<ColumnSpec>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(name)))?;
        let specs = stmt
            .query_map([], |row| {
                let name: String = row.get("name")?;
                let type_name: String = row.get("type")?;
                Ok(ColumnSpec::new(name, type_name))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(specs)
    }
}

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(SqlValue::Null),
            Cell::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Cell::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Cell::Real(r) if r.is_finite() => ToSqlOutput::Owned(SqlValue::Real(*r)),
            Cell::Real(_) => ToSqlOutput::Owned(SqlValue::Null),
            Cell::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Cell::Date(d) => ToSqlOutput::Owned(SqlValue::Text(format_date(d))),
        })
    }
}

fn cell_from_sql(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(i) => Cell::Integer(i),
        ValueRef::Real(r) => Cell::Real(r),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Cell::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn create_statement(table: &Table, dest: &str) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(c), table.column_type(c).sql_affinity()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(dest), columns.join(", "))
}

/// Double-quote an identifier for SQLite.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
