//! Input loading for the `score` command.
//!
//! Supports CSV (no header; numeric fields form the vector, every other
//! field is label text) and JSON Lines (`{"vector": [...], "label": "..."}`).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Input file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Jsonl,
}

impl InputFormat {
    /// Picks the format from the file extension; anything but
    /// `.jsonl`/`.ndjson` is read as CSV.
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "jsonl" | "ndjson" => Self::Jsonl,
            _ => Self::Csv,
        }
    }
}

/// One input object.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line in the source file.
    pub line: u64,
    /// Label text; empty when the record has none.
    pub label: String,
    /// Feature vector.
    pub vector: Vec<f64>,
}

/// JSON Lines record structure
#[derive(Debug, Deserialize)]
struct JsonRecord {
    vector: Vec<f64>,
    #[serde(default)]
    label: Option<String>,
}

/// Loads every record of `path`.
pub fn load_records(path: &Path, format: InputFormat, delimiter: u8) -> Result<Vec<Record>> {
    let records = match format {
        InputFormat::Csv => read_csv(path, delimiter)?,
        InputFormat::Jsonl => read_jsonl(path)?,
    };
    if records.is_empty() {
        bail!("No records in {}", path.display());
    }
    Ok(records)
}

/// Reads a header-less CSV file. Lines starting with `#` are comments.
pub fn read_csv(path: &Path, delimiter: u8) -> Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::with_capacity(128 * 1024, file));

    let mut records: Vec<Record> = Vec::new();
    for result in reader.records() {
        let row = result.context("Malformed CSV record")?;
        let line = row.position().map_or(0, csv::Position::line);
        if row.iter().all(str::is_empty) {
            continue;
        }
        let (vector, label) = split_fields(row.iter());
        let record = Record {
            line,
            label,
            vector,
        };
        check_record(&records, &record)?;
        records.push(record);
    }
    Ok(records)
}

/// Reads a JSON Lines file. Blank lines are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::with_capacity(128 * 1024, file);

    let mut records: Vec<Record> = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: JsonRecord = serde_json::from_str(&line)
            .with_context(|| format!("line {line_no}: invalid JSON record"))?;
        let record = Record {
            line: line_no,
            label: parsed.label.unwrap_or_default(),
            vector: parsed.vector,
        };
        check_record(&records, &record)?;
        records.push(record);
    }
    Ok(records)
}

/// Splits fields into the numeric vector and the space-joined label.
pub fn split_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> (Vec<f64>, String) {
    let mut vector = Vec::new();
    let mut labels = Vec::new();
    for field in fields {
        match field.parse::<f64>() {
            Ok(value) => vector.push(value),
            Err(_) if field.is_empty() => {}
            Err(_) => labels.push(field),
        }
    }
    (vector, labels.join(" "))
}

/// Rejects empty, non-finite and wrongly sized vectors with a line number.
fn check_record(previous: &[Record], record: &Record) -> Result<()> {
    if record.vector.is_empty() {
        bail!("line {}: record has no numeric fields", record.line);
    }
    if record.vector.iter().any(|v| !v.is_finite()) {
        bail!("line {}: record has non-finite values", record.line);
    }
    if let Some(first) = previous.first() {
        if first.vector.len() != record.vector.len() {
            bail!(
                "line {}: expected {} values (as on line {}), found {}",
                record.line,
                first.vector.len(),
                first.line,
                record.vector.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
