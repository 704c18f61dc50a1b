//! Import adapters: uploaded file bytes to uniform field records.
//!
//! Every supported format normalizes to the same shape - a sequence of
//! `field name -> value` string mappings - before the contact service ever
//! sees it. Parsing is deliberately forgiving about values (numbers and
//! booleans are stringified, blanks are dropped) and strict about structure
//! (a malformed file fails as a whole).

use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xls, Xlsx};
use thiserror::Error;

/// A single imported record: field name to value.
pub type ImportRecord = BTreeMap<String, String>;

/// Errors produced by the import adapters.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file extension is not one we import.
    #[error("{0}")]
    Unsupported(String),

    /// The file could not be parsed in its declared format.
    #[error("{0}")]
    Parse(String),
}

/// Supported upload formats, detected from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Json,
    Xlsx,
    Xls,
}

impl ImportFormat {
    /// Detect the format from an uploaded filename.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Unsupported`] for unknown extensions.
    pub fn from_filename(name: &str) -> Result<Self, ImportError> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(Self::Csv)
        } else if lower.ends_with(".json") {
            Ok(Self::Json)
        } else if lower.ends_with(".xlsx") {
            Ok(Self::Xlsx)
        } else if lower.ends_with(".xls") {
            Ok(Self::Xls)
        } else {
            Err(ImportError::Unsupported(
                "Unsupported file format.".to_owned(),
            ))
        }
    }
}

/// Parse uploaded bytes into field records.
///
/// # Errors
///
/// Returns [`ImportError::Parse`] if the payload is not valid in the
/// declared format.
pub fn parse_records(format: ImportFormat, bytes: &[u8]) -> Result<Vec<ImportRecord>, ImportError> {
    match format {
        ImportFormat::Csv => parse_csv(bytes),
        ImportFormat::Json => parse_json(bytes),
        ImportFormat::Xlsx => {
            let workbook = Xlsx::new(Cursor::new(bytes))
                .map_err(|e| ImportError::Parse(format!("could not read workbook: {e}")))?;
            workbook_records(workbook)
        }
        ImportFormat::Xls => {
            let workbook = Xls::new(Cursor::new(bytes))
                .map_err(|e| ImportError::Parse(format!("could not read workbook: {e}")))?;
            workbook_records(workbook)
        }
    }
}

/// CSV with a header row naming the fields.
fn parse_csv(bytes: &[u8]) -> Result<Vec<ImportRecord>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Parse(format!("could not read CSV header: {e}")))?
        .clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| ImportError::Parse(format!("could not read CSV row: {e}")))?;
        let mut record = ImportRecord::new();
        for (header, value) in headers.iter().zip(row.iter()) {
            if !header.is_empty() && !value.is_empty() {
                record.insert(header.to_owned(), value.to_owned());
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// JSON array of flat objects; scalar values are stringified, nulls and
/// nested values are dropped.
fn parse_json(bytes: &[u8]) -> Result<Vec<ImportRecord>, ImportError> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_slice(bytes)
        .map_err(|e| ImportError::Parse(format!("invalid JSON: {e}")))?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let mut record = ImportRecord::new();
        for (key, value) in row {
            let value = match value {
                serde_json::Value::String(s) if !s.is_empty() => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            record.insert(key, value);
        }
        records.push(record);
    }
    Ok(records)
}

/// First worksheet of an Excel workbook, header row naming the fields.
fn workbook_records<RS, R>(mut workbook: R) -> Result<Vec<ImportRecord>, ImportError>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Parse("workbook has no sheets".to_owned()))?
        .map_err(|e| ImportError::Parse(format!("could not read sheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    let mut records = Vec::new();
    for row in rows {
        let mut record = ImportRecord::new();
        for (header, cell) in headers.iter().zip(row) {
            let value = cell_to_string(cell);
            if !header.is_empty() && !value.is_empty() {
                record.insert(header.clone(), value);
            }
        }
        records.push(record);
    }
    Ok(records)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    }
}
