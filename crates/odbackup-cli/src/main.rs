//! odbackup: upload a database backup archive to a SharePoint drive and
//! prune old day folders.
//!
//! Configuration comes from the environment (see `Config::from_env`). The
//! process exit code reflects the first failing step. A configuration that
//! fails to load is still reported to the webhook when `BACKUP_WH` is set.

use anyhow::Context;
use clap::Parser;
use odbackup_cli::{report_startup_failure, run, RunRequest};
use odbackup_core::models::SiteSelection;
use odbackup_core::{Config, WebhookConfig};
use odbackup_infra::{init_telemetry, notifier_for, notifier_from_config, LogFormat};

#[derive(Parser)]
#[command(
    name = "odbackup",
    about = "Upload a database backup to OneDrive/SharePoint and apply retention"
)]
struct Cli {
    /// Day folder name, e.g. 2024-01-15
    day_folder: String,
    /// Archive file name inside the day folder
    backup_filename: String,
    /// Override BACKUP_RETENTION_DAYS
    #[arg(long)]
    retention_days: Option<u32>,
    /// Upload only, do not delete old day folders
    #[arg(long)]
    skip_retention: bool,
    /// Override OD_SITE_SELECTION: first or unique
    #[arg(long)]
    site_selection: Option<SiteSelection>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_telemetry(LogFormat::Text)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to initialize tracing")?;
            let notifier = notifier_for(WebhookConfig::from_env().as_ref());
            let code = report_startup_failure(&e, notifier.as_ref()).await;
            std::process::exit(code);
        }
    };
    if let Some(selection) = cli.site_selection {
        config.site_selection = selection;
    }

    init_telemetry(LogFormat::from_json_flag(config.json_logs))
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize tracing")?;

    let request = RunRequest {
        day_folder: cli.day_folder,
        filename: cli.backup_filename,
        retention_days: cli.retention_days.unwrap_or(config.retention_days),
        skip_retention: cli.skip_retention,
    };

    let notifier = notifier_from_config(&config);
    let report = run(&config, &request, notifier.as_ref()).await;

    std::process::exit(report.exit_code());
}
