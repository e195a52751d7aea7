//! Field extraction from decoded MARC records.
//!
//! Repeated fields follow a fixed policy: 035 control numbers accumulate,
//! everything else is last-wins.

use serde::Serialize;

use crate::date::PartialDate;
use crate::marc::{MarcField, MarcRecord};
use crate::model::{normalize_control_number, CONTROL_NUMBER_PREFIX};

/// Leader/06 for language material.
const RECORD_TYPE_TEXT: char = 'a';
/// Leader/07 for serials.
const BIB_LEVEL_SERIAL: char = 's';
/// 008/21 for newspapers.
const CR_TYPE_NEWSPAPER: char = 'n';

const NEWSPAPER_GENRE_PREFIX: &str = "New Zealand newspapers";

const ELECTRONIC_MARKERS: &[&str] = &["electronic", "online resource", "computer"];
const MICROFORM_MARKERS: &[&str] = &["microform", "microfilm", "microfiche"];

/// Normalized view of one newspaper entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedBibRecord {
    /// Bare control numbers (no `(Nz)` prefix), in field order.
    pub control_numbers: Vec<String>,
    pub title: Option<String>,
    pub medium: Option<String>,
    pub uniform_title: Option<String>,
    pub edition: Option<String>,
    pub physical_extent: Option<String>,
    pub frequency: Option<String>,
    pub is_electronic: bool,
    pub is_microform: bool,
    pub genre: Option<String>,
    pub place: Option<String>,
    /// 008/00-05, `yymmdd`.
    pub date_on_file: Option<String>,
    /// 008/06.
    pub date_type: Option<char>,
    pub date1: Option<PartialDate>,
    pub date2: Option<PartialDate>,
    /// 008/21.
    pub continuing_resource_type: Option<char>,
    pub record_type: Option<char>,
    pub bib_level: Option<char>,
}

impl ParsedBibRecord {
    pub fn primary_control_number(&self) -> Option<&str> {
        self.control_numbers.first().map(String::as_str)
    }

    /// Title for display, falling back to the uniform title.
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.uniform_title.as_deref())
    }
}

/// What the extractor made of one raw entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Not a serial (leader/06 + leader/07).
    NotSerial,
    /// A serial whose continuing-resource type is not newspaper.
    NotNewspaper,
    Newspaper(Box<ParsedBibRecord>),
}

pub fn parse(record: &MarcRecord) -> ParseOutcome {
    let record_type = record.record_type();
    let bib_level = record.bib_level();
    if record_type != Some(RECORD_TYPE_TEXT) || bib_level != Some(BIB_LEVEL_SERIAL) {
        return ParseOutcome::NotSerial;
    }

    let mut parsed = ParsedBibRecord {
        record_type,
        bib_level,
        ..Default::default()
    };

    if let Some(fixed) = record.control_field("008") {
        read_fixed_fields(fixed, &mut parsed);
    }
    if parsed.continuing_resource_type != Some(CR_TYPE_NEWSPAPER) {
        return ParseOutcome::NotNewspaper;
    }

    let mut place_260 = None;
    let mut place_264 = None;

    for field in &record.fields {
        match field.tag.as_str() {
            "035" => {
                for value in field.subfield_values('a') {
                    if !value.trim_start().starts_with(CONTROL_NUMBER_PREFIX) {
                        continue;
                    }
                    if let Some(number) = normalize_control_number(value) {
                        if !parsed.control_numbers.contains(&number) {
                            parsed.control_numbers.push(number);
                        }
                    }
                }
            }
            "245" => {
                let title = join_subfields(field, &['a', 'b']);
                if title.is_some() {
                    parsed.title = title;
                }
                if let Some(medium) = field.first_subfield('h') {
                    parsed.medium = clean_value(medium);
                }
                detect_formats(&field.text(), &mut parsed);
            }
            "130" => set_last(&mut parsed.uniform_title, field.first_subfield('a')),
            "250" => set_last(&mut parsed.edition, field.first_subfield('a')),
            "300" => {
                set_last(&mut parsed.physical_extent, Some(field.text().as_str()));
                detect_formats(&field.text(), &mut parsed);
            }
            "310" => set_last(&mut parsed.frequency, field.first_subfield('a')),
            "655" => {
                if let Some(genre) = field.first_subfield('a') {
                    if genre.trim_start().starts_with(NEWSPAPER_GENRE_PREFIX) {
                        set_last(&mut parsed.genre, Some(genre));
                    }
                }
            }
            "260" => set_last(&mut place_260, field.first_subfield('a')),
            "264" => set_last(&mut place_264, field.first_subfield('a')),
            _ => {}
        }
    }

    // RDA records carry the place in 264 instead of 260.
    parsed.place = place_260.or(place_264);

    ParseOutcome::Newspaper(Box::new(parsed))
}

/// 008 positions: 00-05 date on file, 06 date type, 07-10 date1,
/// 11-14 date2, 21 continuing-resource type. A short field leaves the
/// positions it does not reach unset.
fn read_fixed_fields(fixed: &str, parsed: &mut ParsedBibRecord) {
    let chars: Vec<char> = fixed.chars().collect();
    let slice = |from: usize, to: usize| -> Option<String> {
        chars.get(from..to).map(|c| c.iter().collect())
    };

    parsed.date_on_file = slice(0, 6).filter(|s| !s.trim().is_empty());
    parsed.date_type = chars.get(6).copied().filter(|c| *c != ' ');
    parsed.date1 = slice(7, 11).and_then(|s| PartialDate::parse(&s).ok());
    parsed.date2 = slice(11, 15).and_then(|s| PartialDate::parse(&s).ok());
    parsed.continuing_resource_type = chars.get(21).copied();
}

fn detect_formats(text: &str, parsed: &mut ParsedBibRecord) {
    let lowered = text.to_lowercase();
    if ELECTRONIC_MARKERS.iter().any(|m| lowered.contains(m)) {
        parsed.is_electronic = true;
    }
    if MICROFORM_MARKERS.iter().any(|m| lowered.contains(m)) {
        parsed.is_microform = true;
    }
}

fn join_subfields(field: &MarcField, codes: &[char]) -> Option<String> {
    let parts: Vec<&str> = field
        .subfields()
        .iter()
        .filter(|s| codes.contains(&s.code))
        .map(|s| s.value.trim())
        .filter(|v| !v.is_empty())
        .collect();
    clean_value(&parts.join(" "))
}

fn set_last(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(cleaned) = value.and_then(clean_value) {
        *slot = Some(cleaned);
    }
}

/// Trim whitespace and trailing ISBD punctuation (` /:;,=.`).
fn clean_value(value: &str) -> Option<String> {
    let trimmed = value
        .trim()
        .trim_end_matches(|c: char| matches!(c, ' ' | '/' | ':' | ';' | ',' | '=' | '.'));
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIAL_LEADER: &str = "00000cas a2200000 a 4500";

    /// 008 for a newspaper published 1866 to present.
    fn fixed(date1: &str, date2: &str, cr_type: char) -> String {
        format!("860101c{date1}{date2}nz dr {cr_type}p      0   a0eng d")
    }

    fn newspaper() -> MarcRecord {
        let mut record = MarcRecord::new(SERIAL_LEADER);
        record
            .push_control("001", "9912345")
            .push_control("008", fixed("1866", "9999", 'n'))
            .push_data("035", [' ', ' '], &[('a', "(Nz)1234567")])
            .push_data("035", [' ', ' '], &[('a', "(OCoLC)998877")])
            .push_data("245", ['0', '0'], &[('a', "Grey River argus :"), ('b', "a weekly paper.")])
            .push_data("310", [' ', ' '], &[('a', "Daily")])
            .push_data("655", [' ', '7'], &[('a', "New Zealand newspapers.")])
            .push_data("260", [' ', ' '], &[('a', "Greymouth [N.Z.] :"), ('b', "W.H. Harris")]);
        record
    }

    fn parsed(record: &MarcRecord) -> ParsedBibRecord {
        match parse(record) {
            ParseOutcome::Newspaper(p) => *p,
            other => panic!("expected newspaper, got {other:?}"),
        }
    }

    #[test]
    fn extracts_newspaper_fields() {
        let p = parsed(&newspaper());
        assert_eq!(p.control_numbers, vec!["1234567".to_string()]);
        assert_eq!(p.title.as_deref(), Some("Grey River argus : a weekly paper"));
        assert_eq!(p.frequency.as_deref(), Some("Daily"));
        assert_eq!(p.genre.as_deref(), Some("New Zealand newspapers"));
        assert_eq!(p.place.as_deref(), Some("Greymouth [N.Z.]"));
        assert_eq!(p.date_on_file.as_deref(), Some("860101"));
        assert_eq!(p.date_type, Some('c'));
        assert_eq!(p.date1.unwrap().as_str(), "1866");
        assert!(p.date2.unwrap().is_ongoing());
        assert!(!p.is_electronic);
        assert!(!p.is_microform);
    }

    #[test]
    fn non_serial_is_ignored() {
        let mut record = newspaper();
        record.leader = "00000cam a2200000 a 4500".into();
        assert_eq!(parse(&record), ParseOutcome::NotSerial);
    }

    #[test]
    fn non_newspaper_serial_is_dropped() {
        let mut record = MarcRecord::new(SERIAL_LEADER);
        record.push_control("008", fixed("1900", "1950", 'p'));
        assert_eq!(parse(&record), ParseOutcome::NotNewspaper);

        let bare = MarcRecord::new(SERIAL_LEADER);
        assert_eq!(parse(&bare), ParseOutcome::NotNewspaper);
    }

    #[test]
    fn control_numbers_accumulate_without_duplicates() {
        let mut record = newspaper();
        record
            .push_data("035", [' ', ' '], &[('a', "(Nz)7654321"), ('a', "(Nz)1234567")]);
        let p = parsed(&record);
        assert_eq!(p.control_numbers, vec!["1234567".to_string(), "7654321".to_string()]);
        assert_eq!(p.primary_control_number(), Some("1234567"));
    }

    #[test]
    fn repeated_fields_are_last_wins() {
        let mut record = newspaper();
        record
            .push_data("310", [' ', ' '], &[('a', "Weekly")])
            .push_data("260", [' ', ' '], &[('a', "Hokitika, N.Z. :")]);
        let p = parsed(&record);
        assert_eq!(p.frequency.as_deref(), Some("Weekly"));
        assert_eq!(p.place.as_deref(), Some("Hokitika, N.Z"));
    }

    #[test]
    fn format_flags_from_either_field() {
        let mut record = newspaper();
        record.push_data("300", [' ', ' '], &[('a', "1 online resource")]);
        let p = parsed(&record);
        assert!(p.is_electronic);
        assert!(!p.is_microform);

        let mut record = newspaper();
        record.push_data("245", ['0', '0'], &[('a', "Argus"), ('h', "[microform]")]);
        let p = parsed(&record);
        assert!(p.is_microform);
        assert_eq!(p.medium.as_deref(), Some("[microform]"));

        let mut record = newspaper();
        record
            .push_data("245", ['0', '0'], &[('a', "Argus"), ('h', "[electronic resource]")])
            .push_data("300", [' ', ' '], &[('a', "microfilm reels ;"), ('c', "35 mm")]);
        let p = parsed(&record);
        assert!(p.is_electronic && p.is_microform);
    }

    #[test]
    fn other_genres_are_ignored() {
        let mut record = newspaper();
        record.push_data("655", [' ', '7'], &[('a', "Periodicals.")]);
        let p = parsed(&record);
        assert_eq!(p.genre.as_deref(), Some("New Zealand newspapers"));
    }

    #[test]
    fn place_falls_back_to_264() {
        let mut record = MarcRecord::new(SERIAL_LEADER);
        record
            .push_control("008", fixed("1990", "uuuu", 'n'))
            .push_data("264", [' ', '1'], &[('a', "Nelson, N.Z. :")]);
        let p = parsed(&record);
        assert_eq!(p.place.as_deref(), Some("Nelson, N.Z"));
        assert!(p.date2.unwrap().is_unknown());
    }

    #[test]
    fn short_fixed_field_leaves_dates_unset() {
        let mut record = MarcRecord::new(SERIAL_LEADER);
        record.push_control("008", "860101c1866");
        assert_eq!(parse(&record), ParseOutcome::NotNewspaper);
    }
}
