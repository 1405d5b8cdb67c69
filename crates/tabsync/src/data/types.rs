//! Column type definitions.

use serde::{Deserialize, Serialize};

/// Type observed across the non-null cells of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Whole numbers only.
    Integer,
    /// At least one fractional number, all cells numeric.
    Real,
    /// Boolean values.
    Boolean,
    /// Dates and date-times.
    Date,
    /// Anything else.
    Text,
    /// Column holds no non-null cells.
    #[default]
    Empty,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Real)
    }

    /// SQLite column affinity for this type.
    pub fn sql_affinity(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Date => "TIMESTAMP",
            ColumnType::Text | ColumnType::Empty => "TEXT",
        }
    }
}

/// Type a caller declares for a column through schema metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredType {
    Integer,
    Real,
    Date,
}

impl DeclaredType {
    /// Map a free-form type name (as found in `PRAGMA table_info`) onto a
    /// declared type. Unknown names return `None` and leave the column alone.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.contains("int") {
            Some(DeclaredType::Integer)
        } else if ["real", "float", "double", "numeric", "decimal"]
            .iter()
            .any(|t| lower.contains(t))
        {
            Some(DeclaredType::Real)
        } else if lower.contains("date") || lower.contains("time") {
            Some(DeclaredType::Date)
        } else {
            None
        }
    }
}

/// A schema annotation for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared type name, e.g. `INTEGER`, `REAL`, `TIMESTAMP`, `TEXT`.
    #[serde(rename = "type", default)]
    pub type_name: String,
}

impl ColumnSpec {
    /// Create a column annotation.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    /// The declared type this annotation coerces to, if any.
    pub fn declared_type(&self) -> Option<DeclaredType> {
        DeclaredType::from_type_name(&self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_from_sqlite_names() {
        assert_eq!(DeclaredType::from_type_name("INTEGER"), Some(DeclaredType::Integer));
        assert_eq!(DeclaredType::from_type_name("BIGINT"), Some(DeclaredType::Integer));
        assert_eq!(DeclaredType::from_type_name("REAL"), Some(DeclaredType::Real));
        assert_eq!(DeclaredType::from_type_name("double precision"), Some(DeclaredType::Real));
        assert_eq!(DeclaredType::from_type_name("TIMESTAMP"), Some(DeclaredType::Date));
        assert_eq!(DeclaredType::from_type_name("TEXT"), None);
        assert_eq!(DeclaredType::from_type_name(""), None);
    }

    #[test]
    fn test_column_spec_serializes_type_key() {
        let spec = ColumnSpec::new("created_at", "TIMESTAMP");
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "TIMESTAMP");
        assert_eq!(spec.declared_type(), Some(DeclaredType::Date));
    }
}
