//! `nzn reconcile`: stream a MARC21 file through the reconciliation engine.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};

use nzn_config::Settings;
use nzn_io::{JsonDirStore, MarcArchive, MarcReader};
use nzn_recon::{Coordinator, IdentifierIndex, RunMode, RunOptions, RunSummary};

use crate::policy::load_policy;
use crate::CliError;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    /// Count decisions only; nothing is written
    Report,
    /// Write newly found newspapers
    AddNewRecords,
    /// Write improved years onto matched records
    UpdateExistingRecords,
    /// Refresh the archived MARC copy of every matched record
    UpdateMarcFiles,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Report => RunMode::Report,
            Mode::AddNewRecords => RunMode::AddNewRecords,
            Mode::UpdateExistingRecords => RunMode::UpdateExistingRecords,
            Mode::UpdateMarcFiles => RunMode::UpdateMarcFiles,
        }
    }
}

#[derive(Args)]
pub struct ReconcileArgs {
    /// MARC21 (ISO 2709) file
    pub file: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Report)]
    pub mode: Mode,

    /// Engine policy TOML (default: reconcile.policy_file from settings)
    #[arg(long, env = "NZN_POLICY")]
    pub policy: Option<PathBuf>,

    /// Archive directory for `.mrk` copies (overrides settings)
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// Output JSON summary to stdout instead of only the human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON summary to file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn cmd_reconcile(settings: &Settings, args: ReconcileArgs) -> Result<(), CliError> {
    let policy_path = args.policy.as_deref().or(settings.reconcile.policy_file.as_deref());
    let policy = load_policy(policy_path)?;

    let reader = MarcReader::open(&args.file)?;
    let mut store = JsonDirStore::open(&settings.paths.store_dir)?;
    let archive_dir = args.archive_dir.as_ref().unwrap_or(&settings.paths.archive_dir);
    let mut archive = MarcArchive::new(archive_dir);

    let index = IdentifierIndex::build(store.records())?;
    tracing::info!(
        records = store.len(),
        control_numbers = index.len(),
        places = index.places().len(),
        "registry loaded"
    );

    let mut options = RunOptions::new(args.mode.into(), &policy);
    if let Some(secs) = settings.reconcile.progress_interval_secs.filter(|s| *s > 0) {
        options.progress_interval = Duration::from_secs(secs);
    }

    let mut coordinator = Coordinator::new(&policy, index, options);
    let summary = coordinator.run(reader, &mut store, &mut archive)?;

    let json_str = serde_json::to_string_pretty(&summary)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(&summary);
    Ok(())
}

/// Human summary to stderr
fn print_summary(summary: &RunSummary) {
    let s = &summary.stats;
    eprintln!(
        "reconcile ({}): {} entries, {} newspapers: {} matched ({} updated, {} unchanged), {} new, {} skipped",
        summary.mode,
        s.total,
        s.newspapers,
        s.matched,
        s.updated,
        s.unchanged,
        s.created,
        s.skipped(),
    );
    if s.skipped() > 0 {
        eprintln!(
            "skipped: {} no control number, {} microform, {} electronic, {} infrequent, {} no place",
            s.no_control_number, s.microform, s.electronic, s.infrequent, s.no_place,
        );
    }
    if summary.mode.is_dry_run() {
        eprintln!("dry run: nothing written");
    } else {
        eprintln!("written: {} records, {} archive copies", s.written, s.archived);
    }
}
