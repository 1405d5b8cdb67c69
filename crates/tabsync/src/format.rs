//! Format tags for sources and sinks.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TabsyncError;

/// Tabular formats the loader and sinks understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Csv,
    Excel,
    Json,
    /// A table in a SQLite database.
    Database,
}

impl Format {
    /// Guess the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(Format::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Format::Excel),
            "json" => Some(Format::Json),
            "db" | "sqlite" | "sqlite3" => Some(Format::Database),
            _ => None,
        }
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Excel => "xlsx",
            Format::Json => "json",
            Format::Database => "db",
        }
    }
}

impl FromStr for Format {
    type Err = TabsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "excel" | "xlsx" | "xls" => Ok(Format::Excel),
            "json" => Ok(Format::Json),
            "database" | "db" | "sqlite" => Ok(Format::Database),
            other => Err(TabsyncError::UnsupportedFormat(format!(
                "'{}' (use csv, excel, json or database)",
                other
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Csv => write!(f, "csv"),
            Format::Excel => write!(f, "excel"),
            Format::Json => write!(f, "json"),
            Format::Database => write!(f, "database"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_format_tags() {
        assert_eq!("csv".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!("Excel".parse::<Format>().unwrap(), Format::Excel);
        assert_eq!("sqlite".parse::<Format>().unwrap(), Format::Database);

        let err = "parquet".parse::<Format>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path("a/b.XLSX"), Some(Format::Excel));
        assert_eq!(Format::from_path("data.json"), Some(Format::Json));
        assert_eq!(Format::from_path("it_domain.db"), Some(Format::Database));
        assert_eq!(Format::from_path("notes"), None);
    }
}
