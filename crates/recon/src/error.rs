use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Policy validation error (empty list entry, zero interval, etc.).
    ConfigValidation(String),
    /// A year token that is not 4 characters of digits or `u`.
    InvalidDate(String),
    /// Two records claim the same MARC control number.
    DuplicateControlNumber {
        number: String,
        first_id: String,
        first_title: String,
        second_id: String,
        second_title: String,
    },
    /// The raw MARC stream could not be decoded.
    Parse(String),
    /// The record store or archive rejected a write.
    Write { id: String, message: String },
    /// A matched id has no record in the store.
    MissingRecord(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidDate(value) => write!(f, "invalid partial date '{value}'"),
            Self::DuplicateControlNumber {
                number,
                first_id,
                first_title,
                second_id,
                second_title,
            } => write!(
                f,
                "control number '{number}' is claimed by both '{first_id}' ({first_title}) and '{second_id}' ({second_title})"
            ),
            Self::Parse(msg) => write!(f, "MARC parse error: {msg}"),
            Self::Write { id, message } => write!(f, "write failed for '{id}': {message}"),
            Self::MissingRecord(id) => write!(f, "record '{id}' is indexed but not in the store"),
        }
    }
}

impl std::error::Error for ReconError {}
