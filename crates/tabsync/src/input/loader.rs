//! Tabular loader for CSV, Excel and JSON sources.

use std::borrow::Cow;
use std::fs;
use std::io::{BufRead, BufReader, Cursor};

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use serde_json::Value;
use tracing::debug;

use crate::data::{parse_date, Cell, ColumnSpec, Table};
use crate::error::{Result, TabsyncError};
use crate::format::Format;
use crate::merge::records_from_value;
use crate::normalize::Normalizer;

use super::source::{ImportBatch, Source};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// CSV delimiter (None = auto-detect).
    pub delimiter: Option<u8>,
    /// CSV quote character.
    pub quote: u8,
    /// Workbook sheet to read (None = first sheet).
    pub sheet: Option<String>,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Run the type normalizer over loaded tables.
    pub normalize: bool,
    /// Apply the date column-name rule to JSON sources. JSON cells are already
    /// typed, so this is off unless asked for.
    pub json_dates_by_name: bool,
    /// Caller-supplied column types, applied after any schema found in the source.
    pub schema: Vec<ColumnSpec>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
            sheet: None,
            max_rows: None,
            normalize: true,
            json_dates_by_name: false,
            schema: Vec::new(),
        }
    }
}

/// Reads sources into [`Table`]s.
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Create a loader with default configuration.
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    /// Create a loader with custom configuration.
    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load `source` as `format`, returning the normalized table and its provenance.
    pub fn load(&self, source: Source<'_>, format: Format) -> Result<(Table, ImportBatch)> {
        let label = source.label();

        if format == Format::Database {
            return Err(TabsyncError::UnsupportedFormat(
                "database sources are read through RelationalStore".to_string(),
            ));
        }

        let (mut table, bytes, mut schema) = match source {
            Source::Snapshot(snapshot) => {
                if format != Format::Json {
                    return Err(TabsyncError::UnsupportedFormat(format!(
                        "in-memory snapshots are json, not {}",
                        format
                    )));
                }
                let bytes = serde_json::to_vec(&snapshot.data)?;
                let schema = snapshot.metadata.schema.clone().unwrap_or_default();
                (snapshot.to_table(), Cow::Owned(bytes), schema)
            }
            Source::Path(path) => {
                let bytes = fs::read(path).map_err(|e| TabsyncError::io(path, e))?;
                let (table, schema) = self.parse(&bytes, format, &label)?;
                (table, Cow::Owned(bytes), schema)
            }
            Source::Bytes { bytes, .. } => {
                let (table, schema) = self.parse(bytes, format, &label)?;
                (table, Cow::Borrowed(bytes), schema)
            }
        };

        let trimmed: Vec<String> = table.columns().iter().map(|c| c.trim().to_string()).collect();
        let mut headers = unique_headers(trimmed).into_iter();
        table.rename_columns(|_| headers.next().unwrap_or_default());

        if self.config.normalize {
            schema.extend(self.config.schema.iter().cloned());
            let normalizer = match format {
                Format::Json => Normalizer::new()
                    .with_dates_by_name(self.config.json_dates_by_name)
                    .with_numeric_inference(false),
                _ => Normalizer::new(),
            };
            normalizer.with_schema(schema).normalize(&mut table);
        }

        let batch = ImportBatch::new(
            label,
            &bytes,
            format,
            table.row_count(),
            table.column_count(),
        );

        debug!(
            source = %batch.source,
            format = %format,
            rows = batch.row_count,
            columns = batch.column_count,
            "loaded table"
        );

        Ok((table, batch))
    }

    /// List the sheets of a workbook source.
    pub fn sheet_names(&self, source: Source<'_>) -> Result<Vec<String>> {
        let label = source.label();
        let bytes: Cow<'_, [u8]> = match source {
            Source::Path(path) => Cow::Owned(fs::read(path).map_err(|e| TabsyncError::io(path, e))?),
            Source::Bytes { bytes, .. } => Cow::Borrowed(bytes),
            Source::Snapshot(_) => {
                return Err(TabsyncError::UnsupportedFormat(
                    "snapshots have no sheets".to_string(),
                ))
            }
        };
        let workbook = open_workbook(&bytes, &label)?;
        Ok(workbook.sheet_names())
    }

    fn parse(&self, bytes: &[u8], format: Format, label: &str) -> Result<(Table, Vec<ColumnSpec>)> {
        match format {
            Format::Csv => Ok((self.parse_csv(bytes, label)?, Vec::new())),
            Format::Excel => Ok((self.parse_excel(bytes, label)?, Vec::new())),
            Format::Json => parse_json(bytes, label),
            Format::Database => Err(TabsyncError::UnsupportedFormat(format.to_string())),
        }
    }

    /// Parse delimited text.
    fn parse_csv(&self, bytes: &[u8], label: &str) -> Result<Table> {
        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(bytes)
                .ok_or_else(|| TabsyncError::unreadable(label, "no header row"))?,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| TabsyncError::unreadable(label, e))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(TabsyncError::unreadable(label, "no header row"));
        }

        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result.map_err(|e| TabsyncError::unreadable(label, e))?;
            rows.push(record.iter().map(Cell::from_field).collect());
        }

        Ok(Table::from_rows(unique_headers(headers), rows))
    }

    /// Parse the selected (or first) sheet of a workbook.
    fn parse_excel(&self, bytes: &[u8], label: &str) -> Result<Table> {
        let mut workbook = open_workbook(bytes, label)?;

        let sheet = match &self.config.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .into_iter()
                .next()
                .ok_or_else(|| TabsyncError::unreadable(label, "workbook contains no sheets"))?,
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| TabsyncError::unreadable(label, format!("sheet '{}': {}", sheet, e)))?;

        let mut sheet_rows = range.rows();
        let headers: Vec<String> = match sheet_rows.next() {
            Some(row) => row.iter().map(header_text).collect(),
            None => return Ok(Table::default()),
        };

        let limit = self.config.max_rows.unwrap_or(usize::MAX);
        let rows = sheet_rows
            .take(limit)
            .map(|row| row.iter().map(excel_cell).collect())
            .collect();

        Ok(Table::from_rows(unique_headers(headers), rows))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a JSON document: snapshot envelope, record array or single record.
fn parse_json(bytes: &[u8], label: &str) -> Result<(Table, Vec<ColumnSpec>)> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| TabsyncError::unreadable(label, e))?;

    let schema = value
        .get("metadata")
        .and_then(|m| m.get("schema"))
        .and_then(|s| serde_json::from_value::<Vec<ColumnSpec>>(s.clone()).ok())
        .unwrap_or_default();

    let records = records_from_value(value).map_err(|e| TabsyncError::unreadable(label, e))?;
    Ok((Table::from_records(records), schema))
}

fn open_workbook<'a>(bytes: &'a [u8], label: &str) -> Result<Sheets<Cursor<&'a [u8]>>> {
    open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| TabsyncError::unreadable(label, format!("not a workbook: {}", e)))
}

fn header_text(cell: &Data) -> String {
    match excel_cell(cell) {
        Cell::Null => String::new(),
        other => other.to_string(),
    }
}

fn excel_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::String(s) if s.trim().is_empty() => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Cell::Integer(*f as i64),
        Data::Float(f) => Cell::Real(*f),
        Data::Int(i) => Cell::Integer(*i),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt.as_datetime().map(Cell::Date).unwrap_or(Cell::Null),
        Data::DateTimeIso(s) => parse_date(s).map(Cell::Date).unwrap_or_else(|| Cell::text(s.as_str())),
        Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

/// Fill blank headers and disambiguate repeated ones (`name`, `name.1`, ...).
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    for (i, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            header
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.iter().any(|s| s.trim() == name.trim()) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        seen.push(name);
    }
    seen
}

/// Detect the delimiter by analyzing the first few lines.
///
/// Returns `None` when there is no non-blank line to look at.
fn detect_delimiter(bytes: &[u8]) -> Option<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return None;
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64
        } else {
            0.0
        };

        // Higher count with lower variance wins; tab gets a small edge since it
        // rarely shows up inside values.
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Some(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_date;

    #[test]
    fn test_detect_delimiter_csv() {
        assert_eq!(detect_delimiter(b"a,b,c\n1,2,3\n4,5,6"), Some(b','));
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        assert_eq!(detect_delimiter(b"a\tb\tc\n1\t2\t3\n4\t5\t6"), Some(b'\t'));
    }

    #[test]
    fn test_detect_delimiter_respects_quotes() {
        assert_eq!(detect_delimiter(b"name;qty\n\"a, b\";2\n\"c, d\";3"), Some(b';'));
    }

    #[test]
    fn test_detect_delimiter_empty() {
        assert_eq!(detect_delimiter(b"\n  \n"), None);
    }

    #[test]
    fn test_parse_csv_trims_headers_and_infers() {
        let loader = Loader::new();
        let data = b" project_name ,qty,start_date\nAlpha,3,2024-02-01\nBeta,,soon\n";
        let (table, batch) = loader.load(Source::bytes("in.csv", data), Format::Csv).unwrap();

        assert_eq!(table.columns(), &["project_name", "qty", "start_date"]);
        assert_eq!(table.get(0, "qty"), Some(&Cell::Integer(3)));
        assert_eq!(table.get(1, "qty"), Some(&Cell::Null));
        assert_eq!(
            table.get(0, "start_date"),
            Some(&Cell::Date(parse_date("2024-02-01").unwrap()))
        );
        assert_eq!(table.get(1, "start_date"), Some(&Cell::Null));
        assert_eq!(batch.row_count, 2);
        assert_eq!(batch.format, Format::Csv);
    }

    #[test]
    fn test_parse_csv_header_only() {
        let (table, _) = Loader::new()
            .load(Source::bytes("h.csv", b"a,b\n"), Format::Csv)
            .unwrap();
        assert_eq!(table.column_count(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_csv_empty_is_unreadable() {
        let err = Loader::new()
            .load(Source::bytes("empty.csv", b""), Format::Csv)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnreadableSource);
    }

    #[test]
    fn test_max_rows() {
        let config = LoaderConfig {
            max_rows: Some(1),
            ..Default::default()
        };
        let (table, _) = Loader::with_config(config)
            .load(Source::bytes("m.csv", b"a\n1\n2\n3\n"), Format::Csv)
            .unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_unique_headers() {
        let headers = vec!["a".into(), "".into(), "a".into(), "a".into()];
        assert_eq!(unique_headers(headers), vec!["a", "Unnamed: 1", "a.1", "a.2"]);
    }

    #[test]
    fn test_parse_json_envelope_applies_schema() {
        let doc = br#"{
            "metadata": {"schema": [{"name": "hours", "type": "REAL"}]},
            "data": [{"task": "t1", "hours": "2.5"}, {"task": "t2", "hours": "n/a"}]
        }"#;
        let (table, _) = Loader::new().load(Source::bytes("s.json", doc), Format::Json).unwrap();

        assert_eq!(table.get(0, "hours"), Some(&Cell::Real(2.5)));
        assert_eq!(table.get(1, "hours"), Some(&Cell::Null));
        assert_eq!(table.get(0, "task"), Some(&Cell::text("t1")));
    }

    #[test]
    fn test_parse_json_keeps_text_types() {
        let doc = br#"[{"code": "007", "due_date": "2024-01-01"}]"#;
        let (table, _) = Loader::new().load(Source::bytes("s.json", doc), Format::Json).unwrap();

        assert_eq!(table.get(0, "code"), Some(&Cell::text("007")));
        assert_eq!(table.get(0, "due_date"), Some(&Cell::text("2024-01-01")));
    }

    #[test]
    fn test_parse_json_scalar_is_unreadable() {
        let err = Loader::new()
            .load(Source::bytes("s.json", b"42"), Format::Json)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnreadableSource);
    }

    #[test]
    fn test_json_keys_colliding_after_trim() {
        let doc = br#"[{"id": 1, " id": 2}]"#;
        let (table, _) = Loader::new().load(Source::bytes("k.json", doc), Format::Json).unwrap();

        assert_eq!(table.columns(), &["id", "id.1"]);
        assert_eq!(table.get(0, "id"), Some(&Cell::Integer(1)));
        assert_eq!(table.get(0, "id.1"), Some(&Cell::Integer(2)));
    }

    fn two_sheet_workbook() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        for (name, value) in [("First", "one"), ("Second", "two")] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name).unwrap();
            sheet.write_string(0, 0, "label").unwrap();
            sheet.write_string(1, 0, value).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_excel_sheet_selection() {
        let bytes = two_sheet_workbook();

        let (first, _) = Loader::new()
            .load(Source::bytes("book.xlsx", &bytes), Format::Excel)
            .unwrap();
        assert_eq!(first.get(0, "label"), Some(&Cell::text("one")));

        let config = LoaderConfig {
            sheet: Some("Second".to_string()),
            ..Default::default()
        };
        let (second, _) = Loader::with_config(config)
            .load(Source::bytes("book.xlsx", &bytes), Format::Excel)
            .unwrap();
        assert_eq!(second.row_count(), 1);
        assert_eq!(second.get(0, "label"), Some(&Cell::text("two")));

        let names = Loader::new().sheet_names(Source::bytes("book.xlsx", &bytes)).unwrap();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_excel_missing_sheet_is_unreadable() {
        let bytes = two_sheet_workbook();
        let config = LoaderConfig {
            sheet: Some("Nope".to_string()),
            ..Default::default()
        };
        let err = Loader::with_config(config)
            .load(Source::bytes("book.xlsx", &bytes), Format::Excel)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnreadableSource);
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_garbage_workbook_is_unreadable() {
        let err = Loader::new()
            .load(Source::bytes("fake.xlsx", b"definitely not a zip"), Format::Excel)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnreadableSource);
    }

    #[test]
    fn test_database_format_rejected() {
        let err = Loader::new()
            .load(Source::bytes("x.db", b""), Format::Database)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedFormat);
    }
}
