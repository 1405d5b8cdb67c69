//! Fuzz target for date parsing and normalization.
//!
//! Date detection is regex-gated; pathological input must not crash either
//! the parser or a normalization pass over a date-named column.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tabsync::data::parse_date;
use tabsync::{Cell, Normalizer, Table};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10_000 {
        return;
    }

    if let Ok(content) = std::str::from_utf8(data) {
        let _ = parse_date(content);

        let mut table = Table::from_rows(
            vec!["due_date".into(), "amount".into()],
            vec![vec![Cell::text(content), Cell::text(content)]],
        );
        Normalizer::new().normalize(&mut table);
    }
});
