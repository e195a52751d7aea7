// Registry TSV import
// Rows are merged key-by-key onto the existing per-id JSON records.

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use nzn_recon::model::NewspaperRecord;
use nzn_recon::store::RecordStore;

use crate::error::IoError;
use crate::store::JsonDirStore;

/// Header → JSON key. `None` drops the column.
pub fn column_key(header: &str) -> Option<String> {
    let header = header.trim();
    match header {
        "" | "Modified At" | "Modified By" => None,
        "Current?" => Some("is-current".to_string()),
        "Placecode" => Some("nzn-placecode".to_string()),
        other => Some(
            other
                .to_lowercase()
                .replace('_', " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-"),
        ),
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "yes" | "y" | "true" | "1")
}

/// One data row with its 1-based line number in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryRow {
    pub line: u64,
    pub fields: Map<String, Value>,
}

impl RegistryRow {
    pub fn id(&self) -> Option<&str> {
        self.fields
            .get("id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

pub fn read_registry(path: &Path) -> Result<Vec<RegistryRow>, IoError> {
    let content = read_file_as_utf8(path)?;
    parse_registry(&content)
}

/// Parse tab-separated registry text with a header row. Empty cells are
/// omitted from the row.
pub fn parse_registry(content: &str) -> Result<Vec<RegistryRow>, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(content.as_bytes());

    let keys: Vec<Option<String>> = reader
        .headers()
        .map_err(|e| IoError::Tsv {
            line: 1,
            message: e.to_string(),
        })?
        .iter()
        .map(column_key)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IoError::Tsv {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let mut fields = Map::new();
        for (key, cell) in keys.iter().zip(record.iter()) {
            let (Some(key), cell) = (key, cell.trim()) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            let value = if key == "is-current" {
                Value::Bool(parse_flag(cell))
            } else {
                Value::String(cell.to_string())
            };
            fields.insert(key.clone(), value);
        }
        if fields.is_empty() {
            continue;
        }
        rows.push(RegistryRow { line, fields });
    }
    Ok(rows)
}

/// Read file and convert to UTF-8 if needed (legacy exports are Windows-1252)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::io(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            tracing::warn!(path = %path.display(), "input is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub rows: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Merge `rows` into `store`. A row whose merge changes nothing is not
/// written, so re-importing the same file is a no-op.
pub fn import(
    rows: &[RegistryRow],
    store: &mut JsonDirStore,
    source: &str,
) -> Result<ImportSummary, IoError> {
    let note = format!("Imported from registry {source}");
    let mut summary = ImportSummary::default();

    for row in rows {
        summary.rows += 1;
        let id = row.id().ok_or_else(|| IoError::Tsv {
            line: row.line,
            message: "row has no id".to_string(),
        })?;

        let existing = match store.get(id) {
            Some(record) => Some(to_object(record, row.line)?),
            None => None,
        };
        let mut merged = existing.clone().unwrap_or_default();
        merged.insert("id".to_string(), Value::String(id.to_string()));
        for (key, value) in &row.fields {
            if key != "id" {
                merged.insert(key.clone(), value.clone());
            }
        }

        if existing.as_ref() == Some(&merged) {
            summary.unchanged += 1;
            continue;
        }

        let record: NewspaperRecord =
            serde_json::from_value(Value::Object(merged)).map_err(|e| IoError::Tsv {
                line: row.line,
                message: e.to_string(),
            })?;
        let revision = store.save(record, &note)?;
        if existing.is_some() {
            summary.updated += 1;
        } else {
            summary.created += 1;
        }
        tracing::debug!(%id, revision, line = row.line, "registry row imported");
    }

    tracing::info!(
        rows = summary.rows,
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "registry import finished"
    );
    Ok(summary)
}

fn to_object(record: &NewspaperRecord, line: u64) -> Result<Map<String, Value>, IoError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(IoError::Tsv {
            line,
            message: format!("record '{}' did not serialize as an object", record.id),
        }),
        Err(e) => Err(IoError::Tsv {
            line,
            message: e.to_string(),
        }),
    }
}
