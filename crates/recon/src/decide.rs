//! Skip / update / create classification for one parsed entry.

use chrono::NaiveDate;
use serde::Serialize;

use crate::bib::ParsedBibRecord;
use crate::config::ReconConfig;
use crate::date::{is_more_specific, PartialDate};
use crate::error::ReconError;
use crate::index::IdentifierIndex;
use crate::model::{normalize_control_number, NewspaperRecord, CONTROL_NUMBER_PREFIX, UNKNOWN_GENRE};
use crate::place::PlaceNormalizer;
use crate::store::RecordStore;

// ---------------------------------------------------------------------------
// Skip rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoControlNumber,
    Microform,
    Electronic,
    Infrequent,
    NoPlace,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoControlNumber => write!(f, "no_control_number"),
            Self::Microform => write!(f, "microform"),
            Self::Electronic => write!(f, "electronic"),
            Self::Infrequent => write!(f, "infrequent"),
            Self::NoPlace => write!(f, "no_place"),
        }
    }
}

/// What a skip rule sees.
pub struct Candidate<'a> {
    pub parsed: &'a ParsedBibRecord,
    pub place: Option<&'a str>,
    pub config: &'a ReconConfig,
}

pub type SkipPredicate = fn(&Candidate<'_>) -> bool;

/// Evaluated in order; the first matching rule decides the reason.
pub const SKIP_RULES: &[(SkipReason, SkipPredicate)] = &[
    (SkipReason::NoControlNumber, |c| c.parsed.control_numbers.is_empty()),
    (SkipReason::Microform, |c| c.parsed.is_microform),
    (SkipReason::Electronic, |c| c.parsed.is_electronic),
    (SkipReason::Infrequent, |c| {
        c.parsed
            .frequency
            .as_deref()
            .is_some_and(|f| c.config.is_infrequent(f))
    }),
    (SkipReason::NoPlace, |c| c.place.is_none()),
];

pub fn skip_reason(candidate: &Candidate<'_>) -> Option<SkipReason> {
    SKIP_RULES
        .iter()
        .find(|(_, applies)| applies(candidate))
        .map(|(reason, _)| *reason)
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Skip(SkipReason),
    /// Matched an existing record and nothing needs to change.
    Unchanged { id: String },
    Update {
        record: NewspaperRecord,
        changes: Vec<FieldChange>,
        note: String,
    },
    Create { record: NewspaperRecord, note: String },
}

impl Decision {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Skip(_) => None,
            Self::Unchanged { id } => Some(id),
            Self::Update { record, .. } | Self::Create { record, .. } => Some(&record.id),
        }
    }
}

pub struct DecisionEngine<'a> {
    config: &'a ReconConfig,
    places: PlaceNormalizer,
    extracted_on: NaiveDate,
}

impl<'a> DecisionEngine<'a> {
    /// `extracted_on` is the date quoted in provenance notes.
    pub fn new(config: &'a ReconConfig, extracted_on: NaiveDate) -> Self {
        Self {
            config,
            places: config.place_normalizer(),
            extracted_on,
        }
    }

    pub fn classify(
        &self,
        parsed: &ParsedBibRecord,
        index: &IdentifierIndex,
        store: &dyn RecordStore,
    ) -> Result<Decision, ReconError> {
        let place = parsed.place.as_deref().and_then(|raw| self.places.normalize(raw));
        let candidate = Candidate {
            parsed,
            place: place.as_deref(),
            config: self.config,
        };
        if let Some(reason) = skip_reason(&candidate) {
            return Ok(Decision::Skip(reason));
        }

        if let Some((number, id)) = index.lookup_any(&parsed.control_numbers) {
            let existing = store
                .get(id)
                .ok_or_else(|| ReconError::MissingRecord(id.to_string()))?;
            return Ok(self.update(parsed, existing, number));
        }

        // Skip rules guarantee both a control number and a place here.
        let (Some(number), Some(place)) = (parsed.primary_control_number(), place) else {
            return Ok(Decision::Skip(SkipReason::NoControlNumber));
        };
        Ok(self.create(parsed, index, number, place))
    }

    fn update(&self, parsed: &ParsedBibRecord, existing: &NewspaperRecord, number: &str) -> Decision {
        let mut record = existing.clone();
        let mut changes = Vec::new();

        if let Some(to) = improved(existing.first_year, parsed.date1) {
            changes.push(year_change("first-year", existing.first_year, to));
            record.first_year = Some(to);
        }
        if let Some(to) = improved(existing.final_year, parsed.date2) {
            changes.push(year_change("final-year", existing.final_year, to));
            record.final_year = Some(to);
        }

        let is_current = record.final_year.is_some_and(|d| d.is_ongoing());
        if is_current != existing.is_current {
            changes.push(FieldChange {
                field: "is-current",
                from: Some(existing.is_current.to_string()),
                to: Some(is_current.to_string()),
            });
            record.is_current = is_current;
        }

        if changes.is_empty() {
            return Decision::Unchanged { id: record.id };
        }
        Decision::Update {
            record,
            changes,
            note: self.note(number),
        }
    }

    fn create(&self, parsed: &ParsedBibRecord, index: &IdentifierIndex, number: &str, place: String) -> Decision {
        let coding = index.places().resolve(&place);
        let record = NewspaperRecord {
            id: index.next_id(),
            title: parsed.display_title().unwrap_or_default().to_string(),
            genre: UNKNOWN_GENRE.to_string(),
            place: Some(place),
            placecode: coding.placecode,
            district: coding.district,
            region: coding.region,
            first_year: parsed.date1,
            final_year: parsed.date2,
            is_current: parsed.date2.is_some_and(|d| d.is_ongoing()),
            marc_control_number: normalize_control_number(number),
            frequency: parsed.frequency.clone(),
            revision: 0,
            extra: Default::default(),
        };
        Decision::Create {
            record,
            note: self.note(number),
        }
    }

    fn note(&self, number: &str) -> String {
        let number = normalize_control_number(number).unwrap_or_default();
        format!(
            "Reconciled from MARC record {CONTROL_NUMBER_PREFIX}{number}, extracted {}",
            self.extracted_on.format("%Y-%m-%d")
        )
    }
}

/// The new year if it differs and is strictly more specific. A missing
/// stored year counts as fully unknown.
fn improved(stored: Option<PartialDate>, incoming: Option<PartialDate>) -> Option<PartialDate> {
    let incoming = incoming?;
    let current = stored.unwrap_or(PartialDate::UNKNOWN);
    (incoming != current && is_more_specific(&current, &incoming)).then_some(incoming)
}

fn year_change(field: &'static str, from: Option<PartialDate>, to: PartialDate) -> FieldChange {
    FieldChange {
        field,
        from: from.map(|d| d.to_string()),
        to: Some(to.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn date(s: &str) -> PartialDate {
        PartialDate::parse(s).unwrap()
    }

    fn parsed(cn: &str) -> ParsedBibRecord {
        ParsedBibRecord {
            control_numbers: vec![cn.to_string()],
            title: Some("Inangahua Times".into()),
            frequency: Some("Daily".into()),
            place: Some("Reefton, N.Z.".into()),
            date1: Some(date("1872")),
            date2: Some(date("1943")),
            continuing_resource_type: Some('n'),
            ..Default::default()
        }
    }

    fn existing(id: &str, cn: &str) -> NewspaperRecord {
        NewspaperRecord {
            id: id.into(),
            title: "Inangahua Times".into(),
            genre: "Daily".into(),
            place: Some("Reefton".into()),
            placecode: "rf".into(),
            district: "Buller District".into(),
            region: "West Coast".into(),
            first_year: Some(date("187u")),
            final_year: Some(date("1943")),
            is_current: false,
            marc_control_number: Some(cn.into()),
            frequency: None,
            revision: 4,
            extra: Default::default(),
        }
    }

    fn engine(config: &ReconConfig) -> DecisionEngine<'_> {
        DecisionEngine::new(config, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    fn setup(records: Vec<NewspaperRecord>) -> (IdentifierIndex, MemoryStore) {
        let index = IdentifierIndex::build(&records).unwrap();
        (index, MemoryStore::new(records))
    }

    #[test]
    fn skip_precedence() {
        let config = ReconConfig::default();
        let engine = engine(&config);
        let (index, store) = setup(vec![]);

        let mut p = parsed("1");
        p.control_numbers.clear();
        p.is_microform = true;
        assert_eq!(engine.classify(&p, &index, &store).unwrap(), Decision::Skip(SkipReason::NoControlNumber));

        let mut p = parsed("1");
        p.is_microform = true;
        p.is_electronic = true;
        assert_eq!(engine.classify(&p, &index, &store).unwrap(), Decision::Skip(SkipReason::Microform));

        let mut p = parsed("1");
        p.is_electronic = true;
        p.place = None;
        assert_eq!(engine.classify(&p, &index, &store).unwrap(), Decision::Skip(SkipReason::Electronic));

        let mut p = parsed("1");
        p.place = Some("Apia, Samoa".into());
        assert_eq!(engine.classify(&p, &index, &store).unwrap(), Decision::Skip(SkipReason::NoPlace));
        let mut p = parsed("1");
        p.frequency = Some("Monthly".into());
        p.place = Some("Apia, Samoa".into());
        assert_eq!(engine.classify(&p, &index, &store).unwrap(), Decision::Skip(SkipReason::Infrequent));
    }

    #[test]
    fn monthly_is_always_skipped() {
        let config = ReconConfig::default();
        let engine = engine(&config);
        let (index, store) = setup(vec![existing("3", "77")]);

        let mut p = parsed("77");
        p.frequency = Some("Monthly".into());
        p.date1 = Some(date("1870"));
        assert_eq!(engine.classify(&p, &index, &store).unwrap(), Decision::Skip(SkipReason::Infrequent));

        let mut p = parsed("new");
        p.frequency = Some("Monthly".into());
        assert_eq!(engine.classify(&p, &index, &store).unwrap(), Decision::Skip(SkipReason::Infrequent));
    }

    #[test]
    fn update_takes_more_specific_years() {
        let config = ReconConfig::default();
        let engine = engine(&config);
        let (index, store) = setup(vec![existing("3", "77")]);

        let decision = engine.classify(&parsed("(Nz)77"), &index, &store).unwrap();
        let Decision::Update { record, changes, note } = decision else {
            panic!("expected update");
        };
        assert_eq!(record.id, "3");
        assert_eq!(record.first_year, Some(date("1872")));
        assert_eq!(record.revision, 4);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "first-year");
        assert_eq!(changes[0].from.as_deref(), Some("187u"));
        assert_eq!(note, "Reconciled from MARC record (Nz)77, extracted 2026-10-16");
    }

    #[test]
    fn less_specific_years_are_ignored() {
        let config = ReconConfig::default();
        let engine = engine(&config);
        let mut stored = existing("3", "77");
        stored.first_year = Some(date("1872"));
        let (index, store) = setup(vec![stored]);

        let mut p = parsed("77");
        p.date1 = Some(date("187u"));
        assert_eq!(
            engine.classify(&p, &index, &store).unwrap(),
            Decision::Unchanged { id: "3".into() }
        );
    }

    #[test]
    fn ongoing_final_year_sets_current() {
        let config = ReconConfig::default();
        let engine = engine(&config);
        let mut stored = existing("3", "77");
        stored.first_year = Some(date("1872"));
        stored.final_year = None;
        let (index, store) = setup(vec![stored]);

        // 9999 never replaces anything, so a missing final year stays missing.
        let mut p = parsed("77");
        p.date2 = Some(PartialDate::ONGOING);
        assert_eq!(
            engine.classify(&p, &index, &store).unwrap(),
            Decision::Unchanged { id: "3".into() }
        );

        let mut stored = existing("3", "77");
        stored.first_year = Some(date("1872"));
        stored.final_year = Some(PartialDate::ONGOING);
        stored.is_current = false;
        let (index, store) = setup(vec![stored]);
        let Decision::Update { record, changes, .. } = engine.classify(&p, &index, &store).unwrap() else {
            panic!("expected update");
        };
        assert!(record.is_current);
        assert_eq!(changes[0].field, "is-current");
    }

    #[test]
    fn create_with_unknown_place() {
        let config = ReconConfig::default();
        let engine = engine(&config);
        let (index, store) = setup(vec![existing("3", "77")]);

        let mut p = parsed("88");
        p.place = Some("[Kumara, N.Z.]".into());
        p.date2 = Some(PartialDate::ONGOING);
        let Decision::Create { record, note } = engine.classify(&p, &index, &store).unwrap() else {
            panic!("expected create");
        };
        assert_eq!(record.id, "4");
        assert_eq!(record.place.as_deref(), Some("Kumara"));
        assert_eq!(record.placecode, "unknown");
        assert_eq!(record.district, "Unknown District");
        assert_eq!(record.region, "Unknown Region");
        assert_eq!(record.genre, "Unknown");
        assert!(record.is_current);
        assert_eq!(record.marc_control_number.as_deref(), Some("88"));
        assert!(note.contains("(Nz)88"));
    }

    #[test]
    fn create_with_known_place() {
        let config = ReconConfig::default();
        let engine = engine(&config);
        let (index, store) = setup(vec![existing("3", "77")]);

        let Decision::Create { record, .. } = engine.classify(&parsed("99"), &index, &store).unwrap() else {
            panic!("expected create");
        };
        assert_eq!(record.placecode, "rf");
        assert_eq!(record.district, "Buller District");
        assert!(!record.is_current);
    }

    #[test]
    fn rule_table_order_is_fixed() {
        let reasons: Vec<SkipReason> = SKIP_RULES.iter().map(|(r, _)| *r).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::NoControlNumber,
                SkipReason::Microform,
                SkipReason::Electronic,
                SkipReason::Infrequent,
                SkipReason::NoPlace,
            ]
        );
    }
}
