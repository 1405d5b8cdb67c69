//! Record merger: combines existing and incoming record sequences.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::data::{CellKey, Record};
use crate::error::Result;

use super::records::records_from_value;
use super::strategy::{IDENTIFIER_PRIORITY, MergeOptions, MergeStrategy};

/// Something the caller should know about a merge that still went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeWarning {
    /// `update` found no identifier field and appended instead.
    IdentifierNotFound { candidates: Vec<String> },
    /// Incoming records without an identifier value were appended at the end.
    UnkeyedIncoming { field: String, count: usize },
    /// Existing records shared an identifier value; the last one won.
    DuplicateExisting { field: String, count: usize },
}

impl MergeWarning {
    /// Human-readable description.
    pub fn message(&self) -> String {
        match self {
            MergeWarning::IdentifierNotFound { candidates } => format!(
                "No identifier field ({}) in existing records; appended instead of updating",
                candidates.join(", ")
            ),
            MergeWarning::UnkeyedIncoming { field, count } => format!(
                "{} incoming record(s) had no '{}' value and were appended",
                count, field
            ),
            MergeWarning::DuplicateExisting { field, count } => format!(
                "{} existing record(s) repeated a '{}' value and were collapsed",
                count, field
            ),
        }
    }
}

/// Result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Merged records in final order.
    pub records: Vec<Record>,
    /// Strategy that was requested.
    pub strategy: MergeStrategy,
    /// Identifier field used for matching, if any.
    pub identifier: Option<String>,
    /// Number of existing records before the merge.
    pub previous_count: usize,
    /// Number of incoming records.
    pub incoming_count: usize,
    /// Existing records overwritten by an incoming match.
    pub updated: usize,
    /// Incoming records added as new entries.
    pub inserted: usize,
    /// Non-fatal conditions hit during the merge.
    pub warnings: Vec<MergeWarning>,
}

impl MergeOutcome {
    /// Returns true when `update` degraded to `append`.
    pub fn fell_back_to_append(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, MergeWarning::IdentifierNotFound { .. }))
    }
}

/// Position of a record in the merged output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Keyed(CellKey),
    /// Existing record with no identifier value; kept where it was.
    Unkeyed(usize),
}

/// Combines record sequences under a [`MergeStrategy`].
#[derive(Debug, Clone, Default)]
pub struct RecordMerger {
    options: MergeOptions,
}

impl RecordMerger {
    /// Create a merger that sniffs the identifier field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a merger with explicit options.
    pub fn with_options(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Pick the identifier field: the explicit option, or the first
    /// priority-list name present in the first existing record.
    pub fn identifier_field(&self, existing: &[Record]) -> Option<String> {
        if let Some(field) = &self.options.identifier {
            return Some(field.clone());
        }
        let sample = existing.first()?;
        IDENTIFIER_PRIORITY
            .iter()
            .find(|f| sample.contains_key(**f))
            .map(|f| f.to_string())
    }

    /// Merge `incoming` into `existing`.
    pub fn merge(
        &self,
        existing: Vec<Record>,
        incoming: Vec<Record>,
        strategy: MergeStrategy,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome {
            records: Vec::new(),
            strategy,
            identifier: None,
            previous_count: existing.len(),
            incoming_count: incoming.len(),
            updated: 0,
            inserted: 0,
            warnings: Vec::new(),
        };

        match strategy {
            MergeStrategy::Replace => {
                outcome.inserted = incoming.len();
                outcome.records = incoming;
            }
            MergeStrategy::Append => {
                outcome.inserted = incoming.len();
                outcome.records = concat(existing, incoming);
            }
            MergeStrategy::Update if existing.is_empty() => {
                outcome.inserted = incoming.len();
                outcome.records = incoming;
            }
            MergeStrategy::Update => match self.identifier_field(&existing) {
                Some(field) => {
                    self.update_by(&field, existing, incoming, &mut outcome);
                    outcome.identifier = Some(field);
                }
                None => {
                    let warning = MergeWarning::IdentifierNotFound {
                        candidates: IDENTIFIER_PRIORITY.iter().map(|s| s.to_string()).collect(),
                    };
                    warn!("{}", warning.message());
                    outcome.warnings.push(warning);
                    outcome.inserted = incoming.len();
                    outcome.records = concat(existing, incoming);
                }
            },
        }

        debug!(
            strategy = %strategy,
            identifier = outcome.identifier.as_deref().unwrap_or("-"),
            previous = outcome.previous_count,
            incoming = outcome.incoming_count,
            result = outcome.records.len(),
            "merged records"
        );

        outcome
    }

    /// Merge an arbitrary JSON value, which must describe a record sequence.
    pub fn merge_value(
        &self,
        existing: Vec<Record>,
        incoming: Value,
        strategy: MergeStrategy,
    ) -> Result<MergeOutcome> {
        let incoming = records_from_value(incoming)?;
        Ok(self.merge(existing, incoming, strategy))
    }

    fn update_by(
        &self,
        field: &str,
        existing: Vec<Record>,
        incoming: Vec<Record>,
        outcome: &mut MergeOutcome,
    ) {
        let mut slots: IndexMap<Slot, Record> = IndexMap::with_capacity(existing.len());
        let mut duplicates = 0;

        for (i, record) in existing.into_iter().enumerate() {
            let slot = match record.get(field).and_then(|c| c.key()) {
                Some(key) => Slot::Keyed(key),
                None => Slot::Unkeyed(i),
            };
            if slots.insert(slot, record).is_some() {
                duplicates += 1;
            }
        }

        let mut trailing = Vec::new();
        for record in incoming {
            match record.get(field).and_then(|c| c.key()) {
                Some(key) => {
                    if slots.insert(Slot::Keyed(key), record).is_some() {
                        outcome.updated += 1;
                    } else {
                        outcome.inserted += 1;
                    }
                }
                None => trailing.push(record),
            }
        }

        if duplicates > 0 {
            outcome.warnings.push(MergeWarning::DuplicateExisting {
                field: field.to_string(),
                count: duplicates,
            });
        }
        if !trailing.is_empty() {
            outcome.inserted += trailing.len();
            outcome.warnings.push(MergeWarning::UnkeyedIncoming {
                field: field.to_string(),
                count: trailing.len(),
            });
        }

        outcome.records = slots.into_values().chain(trailing).collect();
    }
}

/// Merge with default options.
pub fn merge(existing: Vec<Record>, incoming: Vec<Record>, strategy: MergeStrategy) -> Vec<Record> {
    RecordMerger::new().merge(existing, incoming, strategy).records
}

fn concat(mut existing: Vec<Record>, incoming: Vec<Record>) -> Vec<Record> {
    existing.extend(incoming);
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn rec(pairs: &[(&str, Cell)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn idv(id: i64, v: &str) -> Record {
        rec(&[("id", Cell::Integer(id)), ("v", Cell::text(v))])
    }

    #[test]
    fn test_replace_discards_existing() {
        let out = merge(vec![idv(1, "x")], vec![idv(2, "y")], MergeStrategy::Replace);
        assert_eq!(out, vec![idv(2, "y")]);
    }

    #[test]
    fn test_replace_with_nothing_existing() {
        let out = merge(Vec::new(), vec![idv(2, "y")], MergeStrategy::Replace);
        assert_eq!(out, vec![idv(2, "y")]);
    }

    #[test]
    fn test_append_keeps_duplicates() {
        let one = rec(&[("id", Cell::Integer(1))]);
        let out = merge(vec![one.clone()], vec![one], MergeStrategy::Append);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_update_with_identifier() {
        let outcome = RecordMerger::new().merge(
            vec![idv(1, "old"), idv(2, "keep")],
            vec![idv(1, "new"), idv(3, "fresh")],
            MergeStrategy::Update,
        );

        assert_eq!(outcome.records, vec![idv(1, "new"), idv(2, "keep"), idv(3, "fresh")]);
        assert_eq!(outcome.identifier.as_deref(), Some("id"));
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.inserted, 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_update_without_identifier_appends() {
        let existing = vec![rec(&[("name", Cell::text("a"))])];
        let incoming = vec![rec(&[("name", Cell::text("a"))])];

        let appended = merge(existing.clone(), incoming.clone(), MergeStrategy::Append);
        let outcome = RecordMerger::new().merge(existing, incoming, MergeStrategy::Update);

        assert_eq!(outcome.records, appended);
        assert!(outcome.fell_back_to_append());
        assert_eq!(outcome.identifier, None);
    }

    #[test]
    fn test_update_priority_order() {
        let existing = vec![rec(&[
            ("task_id", Cell::text("T1")),
            ("Index", Cell::Integer(9)),
            ("v", Cell::text("old")),
        ])];
        let merger = RecordMerger::new();
        assert_eq!(merger.identifier_field(&existing).as_deref(), Some("Index"));
    }

    #[test]
    fn test_update_empty_existing_is_replace() {
        let incoming = vec![idv(1, "a"), idv(1, "b")];
        let out = merge(Vec::new(), incoming.clone(), MergeStrategy::Update);
        assert_eq!(out, incoming);
    }

    #[test]
    fn test_update_unkeyed_incoming_goes_last() {
        let existing = vec![idv(1, "a"), idv(2, "b")];
        let unkeyed = rec(&[("id", Cell::Null), ("v", Cell::text("loose"))]);
        let missing = rec(&[("v", Cell::text("no id at all"))]);
        let outcome = RecordMerger::new().merge(
            existing,
            vec![unkeyed.clone(), idv(3, "c"), missing.clone()],
            MergeStrategy::Update,
        );

        assert_eq!(
            outcome.records,
            vec![idv(1, "a"), idv(2, "b"), idv(3, "c"), unkeyed, missing]
        );
        assert!(outcome
            .warnings
            .contains(&MergeWarning::UnkeyedIncoming { field: "id".into(), count: 2 }));
    }

    #[test]
    fn test_update_keeps_unkeyed_existing_in_place() {
        let loose = rec(&[("id", Cell::Null), ("v", Cell::text("loose"))]);
        let out = merge(
            vec![idv(1, "a"), loose.clone(), idv(2, "b")],
            vec![idv(2, "B")],
            MergeStrategy::Update,
        );
        assert_eq!(out, vec![idv(1, "a"), loose, idv(2, "B")]);
    }

    #[test]
    fn test_update_matches_integral_real_ids() {
        let incoming = vec![rec(&[("id", Cell::Real(1.0)), ("v", Cell::text("new"))])];
        let out = merge(vec![idv(1, "old")], incoming.clone(), MergeStrategy::Update);
        assert_eq!(out, incoming);
    }

    #[test]
    fn test_explicit_identifier_skips_sniffing() {
        let existing = vec![
            rec(&[("id", Cell::Integer(1)), ("code", Cell::text("A")), ("v", Cell::text("old"))]),
            rec(&[("id", Cell::Integer(2)), ("code", Cell::text("B")), ("v", Cell::text("b"))]),
        ];
        let incoming = vec![rec(&[
            ("id", Cell::Integer(99)),
            ("code", Cell::text("A")),
            ("v", Cell::text("new")),
        ])];

        let merger = RecordMerger::with_options(MergeOptions::new().with_identifier("code"));
        let outcome = merger.merge(existing, incoming, MergeStrategy::Update);

        assert_eq!(outcome.identifier.as_deref(), Some("code"));
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].get("v"), Some(&Cell::text("new")));
    }

    #[test]
    fn test_duplicate_existing_ids_warn() {
        let outcome = RecordMerger::new().merge(
            vec![idv(1, "first"), idv(1, "second")],
            Vec::new(),
            MergeStrategy::Update,
        );
        assert_eq!(outcome.records, vec![idv(1, "second")]);
        assert_eq!(
            outcome.warnings,
            vec![MergeWarning::DuplicateExisting { field: "id".into(), count: 1 }]
        );
    }

    #[test]
    fn test_merge_value_rejects_non_sequence() {
        let err = RecordMerger::new()
            .merge_value(vec![idv(1, "a")], json!("not records"), MergeStrategy::Append)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMergeInput);

        let outcome = RecordMerger::new()
            .merge_value(vec![idv(1, "a")], json!([{"id": 2, "v": "b"}]), MergeStrategy::Append)
            .unwrap();
        assert_eq!(outcome.records, vec![idv(1, "a"), idv(2, "b")]);
    }
}
