// User settings
// Loaded from ~/.config/nzn/settings.toml (or an explicit --config path)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    /// An explicitly requested settings file is missing.
    NotFound(PathBuf),
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "settings file not found: {}", path.display()),
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Parse { path, message } => {
                write!(f, "invalid settings in {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Where the registry lives on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Directory of `<id>.json` records
    pub store_dir: PathBuf,

    /// Directory of archived `<id>.mrk` copies
    pub archive_dir: PathBuf,

    /// Dataset document written by `nzn export`
    pub dataset_file: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        let base = Settings::data_dir();
        Self {
            store_dir: base.join("newspapers"),
            archive_dir: base.join("marc"),
            dataset_file: base.join("site").join("newspapers.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Engine policy TOML (excluded places, infrequent frequencies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<PathBuf>,

    /// Overrides the policy's progress interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub reconcile: ReconcileSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nzn")
            .join("settings.toml")
    }

    /// Base directory for default data paths
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nzn")
    }

    pub fn from_toml(input: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load settings. An explicit path must exist; a missing default file
    /// means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path(),
        };

        if !path.exists() {
            if explicit.is_some() {
                return Err(ConfigError::NotFound(path));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let mut settings = Self::from_toml(&contents, &path)?;
        settings.resolve_relative(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(settings)
    }

    /// Relative paths in a settings file are relative to that file.
    fn resolve_relative(&mut self, base: &Path) {
        for p in [
            &mut self.paths.store_dir,
            &mut self.paths.archive_dir,
            &mut self.paths.dataset_file,
        ] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        if let Some(policy) = self.reconcile.policy_file.as_mut() {
            if policy.is_relative() {
                *policy = base.join(&*policy);
            }
        }
    }
}
