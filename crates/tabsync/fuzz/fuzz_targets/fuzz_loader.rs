//! Fuzz target for the tabular loader.
//!
//! The loader must return an error, never panic, on malformed CSV, JSON or
//! workbook bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tabsync::{Format, Loader, Source};

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let loader = Loader::new();
    for format in [Format::Csv, Format::Json, Format::Excel] {
        let _ = loader.load(Source::bytes("fuzz", data), format);
    }
});
