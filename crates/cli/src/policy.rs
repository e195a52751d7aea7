//! `nzn validate-policy` and policy loading for `nzn reconcile`.

use std::path::{Path, PathBuf};

use clap::Args;

use nzn_recon::ReconConfig;

use crate::CliError;

#[derive(Args)]
pub struct ValidatePolicyArgs {
    /// Path to the policy TOML file
    pub policy: PathBuf,
}

/// Read and validate a policy file. `None` means the built-in defaults.
pub fn load_policy(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read policy {}: {e}", path.display())))?;
    let config = ReconConfig::from_toml(&text).map_err(|e| {
        CliError::args(format!("{}: {e}", path.display()))
            .with_hint("policy keys: excluded_places, infrequent_frequencies, progress_interval_secs")
    })?;
    tracing::debug!(path = %path.display(), "policy loaded");
    Ok(config)
}

pub fn cmd_validate_policy(args: ValidatePolicyArgs) -> Result<(), CliError> {
    let config = load_policy(Some(&args.policy))?;
    eprintln!(
        "policy ok: {} excluded places, {} infrequent frequencies, progress every {}s",
        config.excluded_places.len(),
        config.infrequent_frequencies.len(),
        config.progress_interval_secs,
    );
    Ok(())
}
