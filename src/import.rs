use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::db;
use crate::error::Result;
use crate::pipeline::{persist_batch, PersistCounts};
use crate::record::ProviderRecord;
use crate::upsert::UpdatePolicy;

/// One row of a record file. Unknown keys are ignored; `category` and
/// `category_name` hold a comma/semicolon separated category list.
#[derive(Debug, Deserialize)]
struct ImportRow {
    #[serde(alias = "category")]
    category_name: Option<String>,
    #[serde(flatten)]
    record: ProviderRecord,
}

impl From<ImportRow> for ProviderRecord {
    fn from(row: ImportRow) -> Self {
        match row.category_name {
            Some(text) => row.record.with_category_text(&text),
            None => row.record,
        }
    }
}

/// Parsed rows in file order; a row that cannot be decoded carries the reason.
pub type Rows = Vec<std::result::Result<ProviderRecord, String>>;

/// Record file layouts accepted by `load_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Header row naming record fields, one record per row.
    Csv,
    /// An array of record objects.
    Json,
}

impl RecordFormat {
    /// `.json` files are JSON; anything else is read as CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RecordFormat::Json,
            _ => RecordFormat::Csv,
        }
    }
}

/// Read a record file. Only an unreadable file, header, or JSON document is
/// an error; bad rows are returned as such.
pub fn load_records(path: &Path) -> Result<Rows> {
    let bytes = std::fs::read(path)?;
    let text = decode_text(&bytes);
    match RecordFormat::from_path(path) {
        RecordFormat::Csv => parse_csv(&text),
        RecordFormat::Json => parse_json(&text),
    }
}

/// UTF-8 (BOM stripped) when the bytes are valid UTF-8, Latin-1 otherwise.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("record file is not UTF-8, reading it as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Rows of a CSV file with a header line. Header names are matched
/// case-insensitively; empty cells count as missing.
pub fn parse_csv(text: &str) -> Result<Rows> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| match h.to_ascii_lowercase().as_str() {
            "category" | "category_names" => "category_name".to_string(),
            other => other.to_string(),
        })
        .collect();

    Ok(reader
        .records()
        .map(|row| -> std::result::Result<ProviderRecord, String> {
            let row = row.map_err(|e| e.to_string())?;
            let mut fields = Map::new();
            for (header, value) in headers.iter().zip(row.iter()) {
                if !value.is_empty() {
                    fields
                        .entry(header.clone())
                        .or_insert_with(|| Value::String(value.to_string()));
                }
            }
            decode_row(Value::Object(fields))
        })
        .collect())
}

/// Rows of a JSON array of objects.
pub fn parse_json(text: &str) -> Result<Rows> {
    let values: Vec<Value> = serde_json::from_str(text)?;
    Ok(values.into_iter().map(decode_row).collect())
}

fn decode_row(value: Value) -> std::result::Result<ProviderRecord, String> {
    serde_json::from_value::<ImportRow>(value)
        .map(ProviderRecord::from)
        .map_err(|e| e.to_string())
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub create_categories: bool,
    pub policy: UpdatePolicy,
    pub dry_run: bool,
    /// Source label for rows that do not name one.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub row: usize,
    pub name: String,
    /// Names of stored resources, or earlier rows, with the same key.
    pub matches: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub rows: usize,
    pub valid: usize,
    pub invalid: Vec<(usize, String)>,
    pub duplicates: Vec<Duplicate>,
    pub persisted: Option<PersistCounts>,
}

impl ImportReport {
    pub fn print(&self) {
        println!(
            "{} rows: {} valid, {} invalid, {} duplicates",
            self.rows,
            self.valid,
            self.invalid.len(),
            self.duplicates.len()
        );
        for (row, reason) in &self.invalid {
            println!("    row #{} invalid: {}", row, reason);
        }
        for d in &self.duplicates {
            println!("    row #{} ({}) duplicates {}", d.row, d.name, d.matches.join(", "));
        }
        match &self.persisted {
            Some(p) => println!(
                "Imported: {} created, {} updated, {} unchanged.",
                p.created, p.updated, p.unchanged
            ),
            None => println!("Dry run, nothing written."),
        }
    }
}

/// Validate rows (1-based in the report), flag duplicates, then upsert all
/// valid rows in a single transaction unless `dry_run` is set.
pub fn run_import(conn: &Connection, rows: Rows, options: &ImportOptions) -> Result<ImportReport> {
    let mut known: HashMap<String, Vec<String>> = HashMap::new();
    for (key, name) in db::resource_names_by_key(conn)? {
        known.entry(key).or_default().push(name);
    }

    let mut report = ImportReport {
        rows: rows.len(),
        ..Default::default()
    };
    let mut valid = Vec::new();

    for (i, row) in rows.into_iter().enumerate() {
        let index = i + 1;
        let mut record = match row {
            Ok(record) => record,
            Err(reason) => {
                warn!(row = index, "unreadable row: {}", reason);
                report.invalid.push((index, reason));
                continue;
            }
        };
        if record.source.trim().is_empty() {
            record.source = options.source.clone();
        }
        if !record.is_valid() {
            report.invalid.push((index, "missing name".to_string()));
            continue;
        }

        let key = record.key();
        if let Some(matches) = known.get(&key) {
            report.duplicates.push(Duplicate {
                row: index,
                name: record.name.clone(),
                matches: matches.clone(),
            });
        }
        known.entry(key).or_default().push(record.name.clone());
        valid.push(record);
    }
    report.valid = valid.len();

    if !options.dry_run {
        let persisted = persist_batch(conn, &valid, options.create_categories, options.policy)?;
        info!(created = persisted.created, updated = persisted.updated, "import committed");
        report.persisted = Some(persisted);
    }
    Ok(report)
}

// ── Tests ──
