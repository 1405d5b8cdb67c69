//! Core data model: cells, records and tables.

mod cell;
mod table;
mod types;

pub use cell::{format_date, is_null_token, parse_date, parse_number, Cell, CellKey};
pub use table::{Record, Table};
pub use types::{ColumnSpec, ColumnType, DeclaredType};
