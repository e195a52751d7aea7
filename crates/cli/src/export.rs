//! `nzn export`: write the dataset document the browser page loads.

use std::path::PathBuf;

use clap::Args;

use nzn_config::Settings;
use nzn_io::{dataset, JsonDirStore};

use crate::CliError;

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: paths.dataset_file from settings)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn cmd_export(settings: &Settings, args: ExportArgs) -> Result<(), CliError> {
    let store = JsonDirStore::open(&settings.paths.store_dir)?;
    let path = args.output.unwrap_or_else(|| settings.paths.dataset_file.clone());
    let count = dataset::export(store.records(), &path)?;
    eprintln!("wrote {} newspapers to {}", count, path.display());
    Ok(())
}
