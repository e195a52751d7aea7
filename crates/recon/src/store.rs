//! Persistence seams. The engine reads and writes through these traits;
//! `nzn-io` provides the on-disk implementations.

use std::collections::BTreeMap;

use crate::marc::MarcRecord;
use crate::model::NewspaperRecord;

pub trait RecordStore {
    fn get(&self, id: &str) -> Option<&NewspaperRecord>;

    /// Persist `record` with a change annotation. Implementations bump the
    /// revision by exactly one and return the new revision.
    fn write(&mut self, record: NewspaperRecord, note: &str) -> Result<u64, String>;
}

/// Receives a copy of the source MARC entry for each matched or created id.
pub trait ArchiveSink {
    fn archive(&mut self, id: &str, record: &MarcRecord) -> Result<(), String>;
}

/// In-memory store, used for dry runs and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<String, NewspaperRecord>,
    notes: Vec<(String, u64, String)>,
}

impl MemoryStore {
    pub fn new(records: impl IntoIterator<Item = NewspaperRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
            notes: Vec::new(),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &NewspaperRecord> {
        self.records.values()
    }

    /// `(id, revision, note)` for every write, oldest first.
    pub fn notes(&self) -> &[(String, u64, String)] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: &str) -> Option<&NewspaperRecord> {
        self.records.get(id)
    }

    fn write(&mut self, mut record: NewspaperRecord, note: &str) -> Result<u64, String> {
        let previous = self.records.get(&record.id).map(|r| r.revision).unwrap_or(0);
        record.revision = previous + 1;
        let revision = record.revision;
        self.notes.push((record.id.clone(), revision, note.to_string()));
        self.records.insert(record.id.clone(), record);
        Ok(revision)
    }
}

/// Archive that keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    pub entries: BTreeMap<String, MarcRecord>,
}

impl ArchiveSink for MemoryArchive {
    fn archive(&mut self, id: &str, record: &MarcRecord) -> Result<(), String> {
        self.entries.insert(id.to_string(), record.clone());
        Ok(())
    }
}
