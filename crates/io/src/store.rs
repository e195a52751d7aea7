// Per-id JSON record store
// One `<id>.json` per newspaper plus an append-only `_changes.jsonl`.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use nzn_recon::model::NewspaperRecord;
use nzn_recon::store::RecordStore;

use crate::error::IoError;

pub const CHANGES_FILE: &str = "_changes.jsonl";

/// One line of `_changes.jsonl`.
#[derive(Debug, Serialize)]
struct ChangeLine<'a> {
    at: String,
    id: &'a str,
    revision: u64,
    note: &'a str,
}

pub struct JsonDirStore {
    dir: PathBuf,
    records: BTreeMap<String, NewspaperRecord>,
}

impl JsonDirStore {
    /// Load every `<id>.json` under `dir`. A missing directory is an empty
    /// store; it is created on the first write. Any file that does not parse
    /// as a record aborts the load.
    pub fn open(dir: &Path) -> Result<Self, IoError> {
        if !dir.exists() {
            tracing::debug!(dir = %dir.display(), "record store directory does not exist yet");
            return Ok(Self {
                dir: dir.to_path_buf(),
                records: BTreeMap::new(),
            });
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| IoError::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_record_file(p))
            .collect();
        paths.sort();

        let mut records = BTreeMap::new();
        for path in paths {
            let record = read_record(&path)?;
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if stem != record.id {
                tracing::warn!(file = %path.display(), id = %record.id, "record id does not match file name");
            }
            records.insert(record.id.clone(), record);
        }

        tracing::debug!(dir = %dir.display(), records = records.len(), "record store loaded");
        Ok(Self {
            dir: dir.to_path_buf(),
            records,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Records in id order (by string).
    pub fn records(&self) -> impl Iterator<Item = &NewspaperRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write `record` with revision = previous + 1 (1 for a new id) and log
    /// the change. Returns the new revision.
    pub fn save(&mut self, mut record: NewspaperRecord, note: &str) -> Result<u64, IoError> {
        let previous = self.records.get(&record.id).map(|r| r.revision).unwrap_or(0);
        record.revision = previous + 1;

        fs::create_dir_all(&self.dir).map_err(|e| IoError::io(&self.dir, e))?;
        let path = self.record_path(&record.id);
        let temp = path.with_extension("json.tmp");
        let mut json = serde_json::to_string_pretty(&record).map_err(|e| IoError::Json {
            path: path.clone(),
            message: e.to_string(),
        })?;
        json.push('\n');
        fs::write(&temp, json).map_err(|e| IoError::io(&temp, e))?;
        fs::rename(&temp, &path).map_err(|e| IoError::io(&path, e))?;

        self.append_change(&record.id, record.revision, note)?;

        let revision = record.revision;
        self.records.insert(record.id.clone(), record);
        Ok(revision)
    }

    fn append_change(&self, id: &str, revision: u64, note: &str) -> Result<(), IoError> {
        let path = self.dir.join(CHANGES_FILE);
        let line = ChangeLine {
            at: chrono::Utc::now().to_rfc3339(),
            id,
            revision,
            note,
        };
        let mut json = serde_json::to_string(&line).map_err(|e| IoError::Json {
            path: path.clone(),
            message: e.to_string(),
        })?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| IoError::io(&path, e))?;
        file.write_all(json.as_bytes()).map_err(|e| IoError::io(&path, e))
    }
}

impl RecordStore for JsonDirStore {
    fn get(&self, id: &str) -> Option<&NewspaperRecord> {
        self.records.get(id)
    }

    fn write(&mut self, record: NewspaperRecord, note: &str) -> Result<u64, String> {
        self.save(record, note).map_err(|e| e.to_string())
    }
}

fn is_record_file(path: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with('_') && !n.starts_with('.'));
    named && path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

fn read_record(path: &Path) -> Result<NewspaperRecord, IoError> {
    let content = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| IoError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
