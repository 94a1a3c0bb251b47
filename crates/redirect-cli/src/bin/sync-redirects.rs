// # sync-redirects
//
// Reconciles Cloudflare against a redirect document.
//
// This is a THIN integration layer: it checks the credential, validates the
// document, builds the provider and hands everything to `Reconciler`.
//
// ## Configuration
//
// - `CLOUDFLARE_API_TOKEN`: API token (required)
// - `REDIRECT_MODE=dry-run`: read only, log intended changes
// - `REDIRECT_OBJECT_MODEL`, `REDIRECT_RULESET_CAP`, `REDIRECT_LEGACY_CLEANUP`,
//   `REDIRECT_LOG_LEVEL`: see `redirect_cli::settings`
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// sync-redirects --config redirects.json
// ```

use anyhow::Result;
use clap::Parser;
use redirect_cli::settings::{self, Settings};
use redirect_cli::{RunStatus, logging};
use redirect_core::{DesiredConfig, Reconciler, SyncReport, config};
use redirect_provider_cloudflare::CloudflareProvider;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

/// Sync redirects.json to Cloudflare
#[derive(Debug, Parser)]
#[command(name = "sync-redirects", version)]
struct Args {
    /// Path to the redirect document
    #[arg(long, default_value = "redirects.json")]
    config: PathBuf,

    /// Perform reads only and log intended changes
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // The credential is checked before anything else happens
    let api_token = match settings::api_token_from_env() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("{}", e);
            return RunStatus::Failure.into();
        }
    };

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return RunStatus::Failure.into();
        }
    };

    if let Err(e) = logging::init(settings.log_level) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RunStatus::Failure.into();
    }

    let validated = match config::validate_file(&args.config) {
        Ok(validated) => validated,
        Err(e) => {
            error!("Validation failed: {}", e);
            return RunStatus::Failure.into();
        }
    };
    info!("Configuration file is valid");

    let dry_run = args.dry_run || settings.dry_run;
    if dry_run {
        warn!("Running in DRY-RUN mode - no changes will be made");
    }

    // One request in flight at a time
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RunStatus::Failure.into();
        }
    };

    match rt.block_on(run_sync(api_token, dry_run, settings, validated.config)) {
        Ok(report) => {
            info!(
                "Synchronized {} redirect(s) across {} zone(s) in {}ms",
                report.total_added(),
                report.zones.len(),
                report.elapsed().num_milliseconds()
            );
            info!("DNS synchronization completed successfully");
            RunStatus::Success.into()
        }
        Err(e) => {
            error!("Sync failed: {}", e);
            RunStatus::Failure.into()
        }
    }
}

/// Build the provider and reconcile every zone
async fn run_sync(
    api_token: String,
    dry_run: bool,
    settings: Settings,
    desired: DesiredConfig,
) -> Result<SyncReport> {
    let provider = CloudflareProvider::new(api_token, dry_run)?;
    let (reconciler, mut events) = Reconciler::new(Box::new(provider), settings.reconciler)?;

    let outcome = reconciler.run(&desired).await;

    while let Ok(event) = events.try_recv() {
        debug!("Sync event: {:?}", event);
    }

    Ok(outcome?)
}
