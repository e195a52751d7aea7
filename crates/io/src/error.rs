use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum IoError {
    /// Input file does not exist.
    NotFound(PathBuf),
    /// Read / write / directory failure.
    Io { path: PathBuf, message: String },
    /// A per-id JSON file that does not parse.
    Json { path: PathBuf, message: String },
    /// Registry TSV problem, `line` is 1-based including the header.
    Tsv { line: u64, message: String },
    /// ISO 2709 decode failure at byte `offset` of the input.
    Marc { offset: u64, message: String },
}

impl IoError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Json { path, message } => {
                write!(f, "malformed record {}: {message}", path.display())
            }
            Self::Tsv { line, message } => write!(f, "registry line {line}: {message}"),
            Self::Marc { offset, message } => {
                write!(f, "MARC decode error at byte {offset}: {message}")
            }
        }
    }
}

impl std::error::Error for IoError {}
