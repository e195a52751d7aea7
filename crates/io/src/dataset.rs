// Static dataset export (`newspapers.json`) for the browser page

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use serde::Serialize;

use nzn_recon::model::NewspaperRecord;
use nzn_recon::PartialDate;

use crate::error::IoError;

pub const DATASET_FILE: &str = "newspapers.json";

/// The subset of a record the page renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatasetEntry<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub genre: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<&'a str>,
    #[serde(rename = "nzn-placecode")]
    pub placecode: &'a str,
    pub district: &'a str,
    pub region: &'a str,
    pub first_year: Option<PartialDate>,
    pub final_year: Option<PartialDate>,
    pub is_current: bool,
}

impl<'a> From<&'a NewspaperRecord> for DatasetEntry<'a> {
    fn from(record: &'a NewspaperRecord) -> Self {
        Self {
            id: &record.id,
            title: &record.title,
            genre: &record.genre,
            place: record.place.as_deref(),
            placecode: &record.placecode,
            district: &record.district,
            region: &record.region,
            first_year: record.first_year,
            final_year: record.final_year,
            is_current: record.is_current,
        }
    }
}

/// Numeric ids in numeric order, then anything else by string.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

pub fn build<'a>(records: impl IntoIterator<Item = &'a NewspaperRecord>) -> Vec<DatasetEntry<'a>> {
    let mut entries: Vec<DatasetEntry<'a>> = records.into_iter().map(DatasetEntry::from).collect();
    entries.sort_by(|a, b| compare_ids(a.id, b.id));
    entries
}

/// Write the dataset document. Returns the number of entries.
pub fn export<'a>(
    records: impl IntoIterator<Item = &'a NewspaperRecord>,
    path: &Path,
) -> Result<usize, IoError> {
    let entries = build(records);
    let json = serde_json::to_string_pretty(&entries).map_err(|e| IoError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }
    let temp = path.with_extension("json.tmp");
    fs::write(&temp, json).map_err(|e| IoError::io(&temp, e))?;
    fs::rename(&temp, path).map_err(|e| IoError::io(path, e))?;

    tracing::info!(path = %path.display(), entries = entries.len(), "dataset exported");
    Ok(entries.len())
}
