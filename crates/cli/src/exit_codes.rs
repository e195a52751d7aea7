//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Success                                                      |
//! | 1    | General error (missing input, malformed JSON, write failure) |
//! | 2    | CLI usage error (bad args, invalid policy)                   |
//! | 3    | Duplicate MARC control number in the registry                |
//! | 4    | MARC input could not be decoded                              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`recon_exit_code`] / [`io_exit_code`]

use nzn_io::IoError;
use nzn_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - missing input file, malformed record JSON, failed write.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid policy file.
pub const EXIT_USAGE: u8 = 2;

/// Two registry records claim the same MARC control number.
pub const EXIT_DUPLICATE_CONTROL_NUMBER: u8 = 3;

/// The MARC file is truncated or structurally invalid.
pub const EXIT_MARC_PARSE: u8 = 4;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::DuplicateControlNumber { .. } => EXIT_DUPLICATE_CONTROL_NUMBER,
        ReconError::Parse(_) => EXIT_MARC_PARSE,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_USAGE,
        ReconError::InvalidDate(_) | ReconError::Write { .. } | ReconError::MissingRecord(_) => {
            EXIT_ERROR
        }
    }
}

/// Map a file I/O error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Marc { .. } => EXIT_MARC_PARSE,
        IoError::NotFound(_) | IoError::Io { .. } | IoError::Json { .. } | IoError::Tsv { .. } => {
            EXIT_ERROR
        }
    }
}
