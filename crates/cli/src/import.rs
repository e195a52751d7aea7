//! `nzn import`: merge a registry TSV export into the record store.

use std::path::PathBuf;

use clap::Args;

use nzn_config::Settings;
use nzn_io::registry;
use nzn_io::JsonDirStore;

use crate::CliError;

#[derive(Args)]
pub struct ImportArgs {
    /// Tab-separated registry export with a header row
    pub file: PathBuf,

    /// Output JSON summary to stdout
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_import(settings: &Settings, args: ImportArgs) -> Result<(), CliError> {
    let rows = registry::read_registry(&args.file)?;
    let mut store = JsonDirStore::open(&settings.paths.store_dir)?;

    let source = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let summary = registry::import(&rows, &mut store, &source)?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    eprintln!(
        "import {}: {} rows, {} created, {} updated, {} unchanged",
        source, summary.rows, summary.created, summary.updated, summary.unchanged,
    );
    Ok(())
}
