//! Relational storage through SQLite.

mod relational;

pub use relational::{IfExists, RelationalStore};
