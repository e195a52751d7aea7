use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::date::{self, PartialDate};

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

pub const UNKNOWN_GENRE: &str = "Unknown";

/// One newspaper in the registry, stored as `<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewspaperRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(rename = "nzn-placecode", default)]
    pub placecode: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, deserialize_with = "date::deserialize_opt")]
    pub first_year: Option<PartialDate>,
    #[serde(default, deserialize_with = "date::deserialize_opt")]
    pub final_year: Option<PartialDate>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marc_control_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default)]
    pub revision: u64,
    /// Registry columns this tool does not model.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl NewspaperRecord {
    /// Normalized control number, if the record carries a non-empty one.
    pub fn control_number(&self) -> Option<String> {
        self.marc_control_number.as_deref().and_then(normalize_control_number)
    }
}

// ---------------------------------------------------------------------------
// Control numbers
// ---------------------------------------------------------------------------

/// Namespace prefix on MARC 035 $a values issued by the national catalogue.
pub const CONTROL_NUMBER_PREFIX: &str = "(Nz)";

/// Strip the `(Nz)` prefix and whitespace. Empty values are `None`.
pub fn normalize_control_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix(CONTROL_NUMBER_PREFIX).unwrap_or(trimmed).trim();
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

/// Location coding copied onto new records whose place is already known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceRecord {
    pub placecode: String,
    pub district: String,
    pub region: String,
}

impl PlaceRecord {
    /// Coding used when the place has never been seen in the registry.
    pub fn unknown() -> Self {
        Self {
            placecode: "unknown".into(),
            district: "Unknown District".into(),
            region: "Unknown Region".into(),
        }
    }
}
