//! Config file initialization command

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::database::config::{CONFIG_FILENAME, IngestConfig, sample_config};

/// Init command arguments
#[derive(Debug, Clone)]
pub struct InitArgs {
    /// Directory holding the exported sheets
    pub input: PathBuf,
    /// Overwrite an existing config file
    pub force: bool,
}

/// Write the sample configuration into the input directory
pub fn handle_init(args: &InitArgs) -> Result<PathBuf, CliError> {
    if !args.input.is_dir() {
        return Err(CliError::InputNotFound(args.input.clone()));
    }

    let config_path = args.input.join(CONFIG_FILENAME);
    if IngestConfig::exists(&args.input) && !args.force {
        return Err(CliError::ConfigExists(config_path));
    }

    std::fs::write(&config_path, sample_config())
        .map_err(|e| CliError::FileWriteError(config_path.clone(), e.to_string()))?;

    println!("Wrote {}", config_path.display());
    Ok(config_path)
}
