//! Property-based tests for tabsync.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p tabsync --test property_tests
//!
//! # More cases (slower but more thorough)
//! PROPTEST_CASES=10000 cargo test -p tabsync --test property_tests
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use serde_json::Value;

use tabsync::merge::merge;
use tabsync::{Cell, Format, Loader, MergeStrategy, Record, RowExpander, Source, Table};

// =============================================================================
// Test Strategies
// =============================================================================

fn date_cell() -> impl Strategy<Value = Cell> {
    (1990i32..2040, 1u32..13, 1u32..29, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, m, d, h, min, s)| {
            let dt: NaiveDateTime = NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(h, min, s))
                .unwrap_or_default();
            Cell::Date(dt)
        },
    )
}

/// String, number, date or missing scalars.
fn scalar_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        Just(Cell::Null),
        any::<i64>().prop_map(Cell::Integer),
        (-1.0e12f64..1.0e12).prop_map(Cell::Real),
        "[a-zA-Z0-9 ,.:/_-]{0,16}".prop_map(Cell::Text),
        date_cell(),
    ]
}

/// Distinct column names with no surrounding whitespace and no identifier names.
fn column_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z][a-z0-9_]{0,8}", 1..=max)
        .prop_map(|names| names.into_iter().map(|n| format!("c_{}", n)).collect())
}

fn table() -> impl Strategy<Value = Table> {
    column_names(5).prop_flat_map(|columns| {
        let width = columns.len();
        prop::collection::vec(prop::collection::vec(scalar_cell(), width), 0..8)
            .prop_map(move |rows| Table::from_rows(columns.clone(), rows))
    })
}

fn records() -> impl Strategy<Value = Vec<Record>> {
    table().prop_map(Table::into_records)
}

fn data_array(envelope: &str) -> String {
    let value: Value = serde_json::from_str(envelope).unwrap();
    serde_json::to_string(&value["data"]).unwrap()
}

fn record_count(envelope: &str) -> u64 {
    let value: Value = serde_json::from_str(envelope).unwrap();
    value["metadata"]["record_count"].as_u64().unwrap()
}

// =============================================================================
// Round trip
// =============================================================================

proptest! {
    #[test]
    fn json_round_trip_is_byte_stable(t in table()) {
        let first = tabsync::sink::to_json_string(&t, None).unwrap();
        let (loaded, _) = Loader::new()
            .load(Source::bytes("t.json", first.as_bytes()), Format::Json)
            .unwrap();
        let second = tabsync::sink::to_json_string(&loaded, None).unwrap();

        prop_assert_eq!(data_array(&first), data_array(&second));
        prop_assert_eq!(record_count(&first), t.row_count() as u64);
        prop_assert_eq!(record_count(&second), t.row_count() as u64);
    }
}

// =============================================================================
// Row expander
// =============================================================================

proptest! {
    #[test]
    fn expanding_comma_free_column_is_identity(
        names in prop::collection::vec(prop::option::of("[a-zA-Z0-9 ._-]{0,12}"), 0..10),
        qty in prop::collection::vec(any::<i32>(), 10),
    ) {
        let rows = names
            .iter()
            .zip(&qty)
            .map(|(name, q)| {
                vec![
                    name.clone().map(Cell::Text).unwrap_or(Cell::Null),
                    Cell::Integer(i64::from(*q)),
                ]
            })
            .collect();
        let t = Table::from_rows(vec!["name".into(), "qty".into()], rows);

        let result = RowExpander::new("name").with_distribute("qty").apply(&t);
        prop_assert_eq!(&result.table, &t);
        prop_assert_eq!(result.rows_split, 0);
    }

    #[test]
    fn split_rows_account_for_every_part(
        parts in prop::collection::vec("[a-z]{1,6}", 1..6),
        qty in 0i64..1000,
    ) {
        let joined = parts.join(", ");
        let t = Table::from_rows(
            vec!["name".into(), "qty".into()],
            vec![vec![Cell::Text(joined.clone()), Cell::Integer(qty)]],
        );
        let result = RowExpander::new("name").with_distribute("qty").apply(&t);

        if parts.len() == 1 {
            prop_assert_eq!(result.table.row_count(), 1);
        } else {
            prop_assert_eq!(result.table.row_count(), parts.len());
            let total: f64 = result
                .table
                .column_values("qty")
                .filter_map(Cell::as_f64)
                .sum();
            prop_assert!((total - qty as f64).abs() < 1e-6);
        }
    }
}

// =============================================================================
// Merger
// =============================================================================

proptest! {
    #[test]
    fn append_keeps_every_record(existing in records(), incoming in records()) {
        let expected = existing.len() + incoming.len();
        let merged = merge(existing.clone(), incoming.clone(), MergeStrategy::Append);

        prop_assert_eq!(merged.len(), expected);
        prop_assert_eq!(&merged[..existing.len()], &existing[..]);
        prop_assert_eq!(&merged[existing.len()..], &incoming[..]);
    }

    #[test]
    fn update_without_identifier_is_append(existing in records(), incoming in records()) {
        let updated = merge(existing.clone(), incoming.clone(), MergeStrategy::Update);
        let appended = merge(existing, incoming, MergeStrategy::Append);
        prop_assert_eq!(updated, appended);
    }

    #[test]
    fn replace_returns_incoming(existing in records(), incoming in records()) {
        let merged = merge(existing, incoming.clone(), MergeStrategy::Replace);
        prop_assert_eq!(merged, incoming);
    }
}
