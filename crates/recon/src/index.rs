//! Control-number index and place table built from the existing registry.

use std::collections::{BTreeMap, HashMap};

use crate::error::ReconError;
use crate::model::{normalize_control_number, NewspaperRecord, PlaceRecord};

#[derive(Debug, Clone)]
struct Claim {
    id: String,
    title: String,
}

/// Canonical place name → location coding. First record seen wins.
#[derive(Debug, Clone, Default)]
pub struct PlaceTable {
    places: BTreeMap<String, PlaceRecord>,
}

impl PlaceTable {
    pub fn get(&self, place: &str) -> Option<&PlaceRecord> {
        self.places.get(place)
    }

    /// Known coding for `place`, or the unknown triple.
    pub fn resolve(&self, place: &str) -> PlaceRecord {
        self.get(place).cloned().unwrap_or_else(PlaceRecord::unknown)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    fn insert_first(&mut self, place: &str, record: PlaceRecord) {
        self.places.entry(place.to_string()).or_insert(record);
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    by_control_number: HashMap<String, Claim>,
    places: PlaceTable,
    max_numeric_id: u64,
}

impl IdentifierIndex {
    /// One pass over the registry. A control number claimed twice aborts.
    pub fn build<'a>(
        records: impl IntoIterator<Item = &'a NewspaperRecord>,
    ) -> Result<Self, ReconError> {
        let mut index = Self::default();

        for record in records {
            if let Some(number) = record.control_number() {
                index.register(&number, &record.id, &record.title)?;
            } else {
                index.note_id(&record.id);
            }

            if let Some(place) = record.place.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                index.places.insert_first(
                    place,
                    PlaceRecord {
                        placecode: record.placecode.clone(),
                        district: record.district.clone(),
                        region: record.region.clone(),
                    },
                );
            }
        }

        tracing::debug!(
            control_numbers = index.by_control_number.len(),
            places = index.places.len(),
            "identifier index built"
        );
        Ok(index)
    }

    /// Claim `number` for `id`. Fails if another record already holds it.
    pub fn register(&mut self, number: &str, id: &str, title: &str) -> Result<(), ReconError> {
        let Some(number) = normalize_control_number(number) else {
            self.note_id(id);
            return Ok(());
        };
        if let Some(existing) = self.by_control_number.get(&number) {
            return Err(ReconError::DuplicateControlNumber {
                number,
                first_id: existing.id.clone(),
                first_title: existing.title.clone(),
                second_id: id.to_string(),
                second_title: title.to_string(),
            });
        }
        self.by_control_number.insert(
            number,
            Claim {
                id: id.to_string(),
                title: title.to_string(),
            },
        );
        self.note_id(id);
        Ok(())
    }

    pub fn lookup(&self, number: &str) -> Option<&str> {
        let number = normalize_control_number(number)?;
        self.by_control_number.get(&number).map(|c| c.id.as_str())
    }

    /// First of `numbers` that resolves, with the number that matched.
    pub fn lookup_any<'a>(&'a self, numbers: &'a [String]) -> Option<(&'a str, &'a str)> {
        numbers
            .iter()
            .find_map(|n| self.lookup(n).map(|id| (n.as_str(), id)))
    }

    pub fn places(&self) -> &PlaceTable {
        &self.places
    }

    /// Next unused numeric id.
    pub fn next_id(&self) -> String {
        (self.max_numeric_id + 1).to_string()
    }

    /// Hold `id` back from allocation without claiming a control number.
    pub fn reserve_id(&mut self, id: &str) {
        self.note_id(id);
    }

    pub fn len(&self) -> usize {
        self.by_control_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_control_number.is_empty()
    }

    fn note_id(&mut self, id: &str) {
        if let Ok(n) = id.trim().parse::<u64>() {
            self.max_numeric_id = self.max_numeric_id.max(n);
        }
    }
}
