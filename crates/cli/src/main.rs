// nzn - NZ newspaper registry: registry import, MARC reconciliation, dataset export

mod exit_codes;
mod export;
mod import;
mod policy;
mod reconcile;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use nzn_config::{ConfigError, Settings};
use nzn_io::IoError;
use nzn_recon::ReconError;

#[derive(Parser)]
#[command(name = "nzn")]
#[command(about = "Reconcile the NZ newspaper registry against MARC21 catalogue exports")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/nzn/settings.toml)
    #[arg(long, global = true, env = "NZN_CONFIG")]
    config: Option<PathBuf>,

    /// Record store directory (overrides settings)
    #[arg(long, global = true, env = "NZN_STORE_DIR")]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a registry TSV export into the record store
    #[command(after_help = "\
Examples:
  nzn import registry.tsv
  nzn import registry.tsv --json")]
    Import(import::ImportArgs),

    /// Reconcile a MARC21 file against the record store
    #[command(after_help = "\
Examples:
  nzn reconcile catalogue.mrc
  nzn reconcile catalogue.mrc --mode add-new-records
  nzn reconcile catalogue.mrc --mode update-existing-records --json
  nzn reconcile catalogue.mrc --mode update-marc-files --archive-dir marc/")]
    Reconcile(reconcile::ReconcileArgs),

    /// Write the static dataset document for the browser page
    #[command(after_help = "\
Examples:
  nzn export
  nzn export --output site/newspapers.json")]
    Export(export::ExportArgs),

    /// Check an engine policy file without running
    #[command(after_help = "\
Examples:
  nzn validate-policy policy.toml")]
    ValidatePolicy(policy::ValidatePolicyArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nzn=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let Cli { config, store_dir, command } = Cli::parse();
    init_tracing();

    let result = match command {
        Commands::Import(args) => load_settings(config.as_deref(), store_dir)
            .and_then(|settings| import::cmd_import(&settings, args)),
        Commands::Reconcile(args) => load_settings(config.as_deref(), store_dir)
            .and_then(|settings| reconcile::cmd_reconcile(&settings, args)),
        Commands::Export(args) => load_settings(config.as_deref(), store_dir)
            .and_then(|settings| export::cmd_export(&settings, args)),
        Commands::ValidatePolicy(args) => policy::cmd_validate_policy(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn load_settings(config: Option<&Path>, store_dir: Option<PathBuf>) -> Result<Settings, CliError> {
    let mut settings = Settings::load(config).map_err(CliError::from)?;
    if let Some(dir) = store_dir {
        settings.paths.store_dir = dir;
    }
    tracing::debug!(store_dir = %settings.paths.store_dir.display(), "settings loaded");
    Ok(settings)
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::DuplicateControlNumber { .. } => {
                Some("fix the marc-control-number of one record before reconciling".to_string())
            }
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                Some("check the policy file with `nzn validate-policy`".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let code = io_exit_code(&err);
        if let IoError::NotFound(path) = &err {
            tracing::error!(path = %path.display(), "input file not found");
        }
        let hint = match &err {
            IoError::Json { .. } => Some("repair or remove the file, then re-run".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::io(err.to_string()).with_hint(format!(
            "default settings location is {}",
            Settings::config_path().display()
        ))
    }
}
