//! Merge strategies and options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TabsyncError;

/// Identifier candidates scanned, in priority order, when no identifier is given.
pub const IDENTIFIER_PRIORITY: &[&str] = &["id", "ID", "index", "Index", "task_id", "project_id"];

/// How incoming records combine with existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Discard existing records; keep incoming verbatim.
    Replace,
    /// Concatenate existing and incoming, no deduplication.
    Append,
    /// Match by identifier, overwrite matches, add the rest.
    #[default]
    Update,
}

impl FromStr for MergeStrategy {
    type Err = TabsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" | "replace_all" | "replace-all" => Ok(MergeStrategy::Replace),
            "append" => Ok(MergeStrategy::Append),
            "update" | "merge" => Ok(MergeStrategy::Update),
            other => Err(TabsyncError::InvalidMergeInput(format!(
                "unknown merge strategy '{}' (use append, update or replace)",
                other
            ))),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Replace => write!(f, "replace"),
            MergeStrategy::Append => write!(f, "append"),
            MergeStrategy::Update => write!(f, "update"),
        }
    }
}

/// Knobs for the record merger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Identifier field to match on. When set, the priority-list scan is skipped.
    pub identifier: Option<String>,
}

impl MergeOptions {
    /// Options that sniff the identifier from the priority list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match on an explicit identifier field.
    pub fn with_identifier(mut self, field: impl Into<String>) -> Self {
        self.identifier = Some(field.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy() {
        assert_eq!("append".parse::<MergeStrategy>().unwrap(), MergeStrategy::Append);
        assert_eq!("Replace All".replace(' ', "_").parse::<MergeStrategy>().unwrap(), MergeStrategy::Replace);
        assert_eq!(" UPDATE ".parse::<MergeStrategy>().unwrap(), MergeStrategy::Update);
        assert!("upsert".parse::<MergeStrategy>().is_err());
    }

    #[test]
    fn test_strategy_serde_names() {
        assert_eq!(serde_json::to_value(MergeStrategy::Append).unwrap(), "append");
        let s: MergeStrategy = serde_json::from_value(serde_json::json!("replace")).unwrap();
        assert_eq!(s, MergeStrategy::Replace);
    }
}
