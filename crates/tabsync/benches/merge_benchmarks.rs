//! Merge, expansion and load benchmarks.
//!
//! Measures record merging, comma fan-out and CSV loading across table sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tabsync::{
    Cell, Format, Loader, MergeStrategy, Record, RecordMerger, RowExpander, Source, Table,
};

/// Generate records with an `id` column and a few mixed-type fields.
fn generate_records(rows: usize, id_offset: usize) -> Vec<Record> {
    (0..rows)
        .map(|i| {
            let mut record = Record::new();
            record.insert("id".into(), Cell::Integer((i + id_offset) as i64));
            record.insert("project".into(), Cell::Text(format!("Project {}", i % 50)));
            record.insert("hours".into(), Cell::Real(i as f64 * 0.5));
            record.insert("owner".into(), Cell::Text(format!("owner_{}, owner_{}", i % 7, i % 11)));
            record
        })
        .collect()
}

/// Generate CSV text with the same shape as [`generate_records`].
fn generate_csv_data(rows: usize) -> String {
    let mut data = String::from("id,project,hours,due_date\n");
    for row in 0..rows {
        data.push_str(&format!(
            "{},Project {},{:.1},2024-{:02}-{:02}\n",
            row,
            row % 50,
            row as f64 * 0.5,
            (row % 12) + 1,
            (row % 28) + 1
        ));
    }
    data
}

/// Benchmark update merges where half the incoming records match.
fn bench_merge_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_update");
    let merger = RecordMerger::new();

    for rows in [100, 1_000, 10_000].iter() {
        let existing = generate_records(*rows, 0);
        let incoming = generate_records(*rows, rows / 2);

        group.throughput(Throughput::Elements((*rows * 2) as u64));
        group.bench_with_input(
            BenchmarkId::new("rows", rows),
            &(existing, incoming),
            |b, (existing, incoming)| {
                b.iter_with_setup(
                    || (existing.clone(), incoming.clone()),
                    |(existing, incoming)| {
                        black_box(merger.merge(existing, incoming, MergeStrategy::Update))
                    },
                )
            },
        );
    }

    group.finish();
}

/// Benchmark comma fan-out with distribution.
fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    let expander = RowExpander::new("owner").with_distribute("hours");

    for rows in [100, 1_000, 10_000].iter() {
        let table = Table::from_records(generate_records(*rows, 0));

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &table, |b, table| {
            b.iter(|| black_box(expander.apply(table)))
        });
    }

    group.finish();
}

/// Benchmark CSV loading including normalization.
fn bench_load_csv(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_csv");
    let loader = Loader::new();

    for rows in [100, 1_000, 10_000].iter() {
        let data = generate_csv_data(*rows);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &data, |b, data| {
            b.iter(|| {
                black_box(
                    loader
                        .load(Source::bytes("bench.csv", data.as_bytes()), Format::Csv)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge_update, bench_expand, bench_load_csv);
criterion_main!(benches);
