//! Partial years with masked trailing digits (`1970`, `197u`, `19uu`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ReconError;

/// Marker for an unknown digit.
pub const UNKNOWN: u8 = b'u';

/// A 4-character year token. Each character is a digit or `u`.
///
/// `9999` is the "still ongoing" sentinel used for the final year of
/// publications that have not ceased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialDate([u8; 4]);

/// How much of a year is known, least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Unknown,
    Millennium,
    Century,
    Decade,
    Year,
    Ongoing,
}

impl PartialDate {
    pub const ONGOING: PartialDate = PartialDate(*b"9999");
    pub const UNKNOWN: PartialDate = PartialDate(*b"uuuu");

    /// Parse a 4-character token. MARC fill characters (blank, `|`) and an
    /// upper-case `U` are read as the unknown marker.
    pub fn parse(s: &str) -> Result<Self, ReconError> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(ReconError::InvalidDate(s.to_string()));
        }
        let mut out = [0u8; 4];
        for (slot, &b) in out.iter_mut().zip(bytes) {
            *slot = match b {
                b'0'..=b'9' => b,
                b'u' | b'U' | b' ' | b'|' => UNKNOWN,
                _ => return Err(ReconError::InvalidDate(s.to_string())),
            };
        }
        Ok(Self(out))
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII digits and `u` are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("uuuu")
    }

    /// Number of trailing unknown markers (0..=4).
    pub fn unknown_suffix_len(&self) -> usize {
        self.0.iter().rev().take_while(|&&b| b == UNKNOWN).count()
    }

    pub fn is_ongoing(&self) -> bool {
        *self == Self::ONGOING
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    pub fn specificity(&self) -> Specificity {
        if self.is_ongoing() {
            return Specificity::Ongoing;
        }
        match self.unknown_suffix_len() {
            0 => Specificity::Year,
            1 => Specificity::Decade,
            2 => Specificity::Century,
            3 => Specificity::Millennium,
            _ => Specificity::Unknown,
        }
    }
}

/// Whether `candidate` should replace `current`.
///
/// Rules are checked in order and the first match wins. `9999` has no
/// unknown suffix, so it is caught by the first rule and never replaced.
pub fn is_more_specific(current: &PartialDate, candidate: &PartialDate) -> bool {
    let current_mask = current.unknown_suffix_len();
    if current_mask == 0 {
        return false;
    }
    if candidate.is_unknown() || candidate.is_ongoing() {
        return false;
    }
    if current == candidate {
        return false;
    }
    if current.is_ongoing() || current.is_unknown() {
        return true;
    }
    let candidate_mask = candidate.unknown_suffix_len();
    match current_mask {
        3 => true,
        2 => candidate_mask != 3,
        1 => candidate_mask < 2,
        _ => false,
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartialDate {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PartialDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PartialDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Deserialize an optional year that may arrive as `null`, `""`, a string
/// or a bare number (registry exports carry all three).
pub fn deserialize_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<PartialDate>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => PartialDate::parse(s.trim())
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(serde_json::Value::Number(n)) => PartialDate::parse(&n.to_string())
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a year, found {other}"
        ))),
    }
}
