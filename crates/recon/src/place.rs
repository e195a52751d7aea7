//! Place-name cleanup for MARC 260/264 $a values.

/// Overseas places that appear in the catalogue but are outside the registry.
pub const DEFAULT_EXCLUDED_PLACES: &[&str] = &[
    "Samoa",
    "Apia",
    "Fiji",
    "Suva",
    "Tonga",
    "Nuku'alofa",
    "Rarotonga",
    "Cook Islands",
    "Niue",
    "Tahiti",
    "Norfolk Island",
];

/// Country marker used in catalogue places ("Auckland, N.Z.").
const COUNTRY_MARKER: &str = "N.Z";

/// Sine loco: the cataloguer did not know the place.
const PLACE_UNKNOWN: &str = "s.l.";

/// Normalizes raw places against a list of excluded locations.
#[derive(Debug, Clone)]
pub struct PlaceNormalizer {
    /// Each excluded name as lower-case words.
    excluded: Vec<Vec<String>>,
}

impl Default for PlaceNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_PLACES.iter().map(|s| s.to_string()))
    }
}

impl PlaceNormalizer {
    pub fn new(excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded: excluded
                .into_iter()
                .map(|s| words(&s))
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Canonical place name, or `None` when the record is not about a
    /// New Zealand place the registry tracks.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }
        if self.is_excluded(raw) {
            return None;
        }

        let mut place = raw.trim_start();
        place = place.strip_prefix('[').unwrap_or(place);

        if place.contains(COUNTRY_MARKER) {
            place = cut_at(place, ",");
            place = cut_at(place, COUNTRY_MARKER);
            place = cut_at_any(place, &['[', ']']);
        }

        let place = place.trim_end_matches(|c: char| c == '?' || c == ']' || c.is_whitespace());
        let cleaned = clean(place);

        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(PLACE_UNKNOWN) {
            return None;
        }
        Some(cleaned)
    }

    /// Whole-word match, so "Tonga" does not exclude "Tongariro".
    fn is_excluded(&self, raw: &str) -> bool {
        let raw = words(raw);
        self.excluded
            .iter()
            .any(|place| raw.windows(place.len()).any(|w| w == place.as_slice()))
    }
}

fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// [`PlaceNormalizer::normalize`] with the default exclusion list.
pub fn normalize_place(raw: &str) -> Option<String> {
    PlaceNormalizer::default().normalize(raw)
}

fn cut_at<'a>(s: &'a str, pattern: &str) -> &'a str {
    match s.find(pattern) {
        Some(i) => &s[..i],
        None => s,
    }
}

fn cut_at_any<'a>(s: &'a str, chars: &[char]) -> &'a str {
    match s.find(chars) {
        Some(i) => &s[..i],
        None => s,
    }
}

/// Collapse whitespace, drop ISBD trailing punctuation and title-case words.
fn clean(s: &str) -> String {
    let joined = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = joined.trim_end_matches(|c: char| matches!(c, ' ' | ':' | ';' | ',' | '/' | '.' | '?'));
    // Keep the abbreviation dot of "S.l." so it can be recognised.
    let trimmed = if trimmed.eq_ignore_ascii_case("s.l") { PLACE_UNKNOWN } else { trimmed };
    trimmed
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
