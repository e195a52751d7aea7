use serde::Deserialize;

use crate::error::ReconError;
use crate::place::{PlaceNormalizer, DEFAULT_EXCLUDED_PLACES};

// ---------------------------------------------------------------------------
// Engine policy
// ---------------------------------------------------------------------------

/// Frequencies too sparse for the registry to track.
pub const DEFAULT_INFREQUENT: &[&str] = &["Annual", "Semiannual", "Quarterly", "Monthly"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Places that mark a record as overseas (case-insensitive substring).
    pub excluded_places: Vec<String>,
    /// MARC 310 values that cause a record to be skipped.
    pub infrequent_frequencies: Vec<String>,
    /// Seconds between progress snapshots.
    pub progress_interval_secs: u64,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            excluded_places: DEFAULT_EXCLUDED_PLACES.iter().map(|s| s.to_string()).collect(),
            infrequent_frequencies: DEFAULT_INFREQUENT.iter().map(|s| s.to_string()).collect(),
            progress_interval_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.progress_interval_secs == 0 {
            return Err(ReconError::ConfigValidation(
                "progress_interval_secs must be at least 1".into(),
            ));
        }
        if self.excluded_places.iter().any(|p| p.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "excluded_places contains an empty entry".into(),
            ));
        }
        if self.infrequent_frequencies.iter().any(|f| f.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "infrequent_frequencies contains an empty entry".into(),
            ));
        }
        Ok(())
    }

    pub fn place_normalizer(&self) -> PlaceNormalizer {
        PlaceNormalizer::new(self.excluded_places.iter().cloned())
    }

    /// Case-insensitive, ignoring trailing punctuation ("Monthly." matches).
    pub fn is_infrequent(&self, frequency: &str) -> bool {
        let frequency = frequency.trim().trim_end_matches(|c: char| c.is_ascii_punctuation());
        self.infrequent_frequencies
            .iter()
            .any(|f| f.eq_ignore_ascii_case(frequency))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
