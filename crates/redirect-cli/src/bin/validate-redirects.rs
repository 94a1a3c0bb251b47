// # validate-redirects
//
// Checks a redirect document without contacting any provider.
//
// ```bash
// validate-redirects                 # ./redirects.json
// validate-redirects path/to/redirects.json
// ```

use clap::Parser;
use redirect_cli::settings;
use redirect_cli::{RunStatus, logging};
use redirect_core::config::{self, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Validate a redirects.json document
#[derive(Debug, Parser)]
#[command(name = "validate-redirects", version)]
struct Args {
    /// Path to the redirect document
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Sync-only settings are not read here
    let log_level = match settings::log_level_from_env() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return RunStatus::Failure.into();
        }
    };

    if let Err(e) = logging::init(log_level) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RunStatus::Failure.into();
    }

    match config::validate_file(&args.config) {
        Ok(validated) => {
            info!(
                "{} redirect(s) across {} zone(s)",
                validated.config.len(),
                validated.zone_count
            );
            info!("Configuration file is valid");
            RunStatus::Success.into()
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            RunStatus::Failure.into()
        }
    }
}
