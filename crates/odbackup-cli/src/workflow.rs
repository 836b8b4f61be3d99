//! One backup run: token, resolve, ensure folder, upload, prune, notify.
//!
//! Steps run strictly in order. Token and resolution failures end the run
//! before any drive call. A failed folder ensure or upload still lets
//! retention run against the resolved drive, but the run is reported as a
//! failure.

use chrono::{DateTime, Utc};
use odbackup_core::models::{PruneReport, RunOutcome, UploadedItem};
use odbackup_core::{
    BackupError, BackupResult, Config, ErrorMetadata, LogLevel, Notifier, EXIT_SUCCESS,
};
use odbackup_graph::{CredentialProvider, GraphClient};
use tracing::Instrument;
use uuid::Uuid;

use crate::local;

/// What to upload and how to prune, as given on the command line.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub day_folder: String,
    pub filename: String,
    pub retention_days: u32,
    pub skip_retention: bool,
}

impl RunRequest {
    pub fn validate(&self) -> BackupResult<()> {
        local::validate_segment("Day folder", &self.day_folder)?;
        local::validate_segment("Backup filename", &self.filename)?;
        if self.retention_days == 0 {
            return Err(BackupError::InvalidInput(
                "Retention window must be at least 1 day".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-step results of a run.
#[derive(Debug, Default)]
pub struct WorkflowReport {
    /// Error that stopped the run before the drive was usable.
    pub fatal: Option<BackupError>,
    /// `None` when the run never reached the upload step.
    pub upload: Option<BackupResult<UploadedItem>>,
    /// `None` when retention was skipped or never reached.
    pub prune: Option<BackupResult<PruneReport>>,
}

impl WorkflowReport {
    fn first_error(&self) -> Option<&BackupError> {
        self.fatal
            .as_ref()
            .or_else(|| self.upload.as_ref().and_then(|r| r.as_ref().err()))
            .or_else(|| self.prune.as_ref().and_then(|r| r.as_ref().err()))
    }

    pub fn outcome(&self) -> RunOutcome {
        let uploaded = matches!(self.upload, Some(Ok(_)));
        if uploaded && self.first_error().is_none() {
            RunOutcome::Success
        } else {
            RunOutcome::Failure
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.first_error() {
            Some(err) => err.exit_code(),
            None if self.outcome().is_success() => EXIT_SUCCESS,
            None => 1,
        }
    }
}

/// Run the workflow now and notify the outcome.
pub async fn run(config: &Config, request: &RunRequest, notifier: &dyn Notifier) -> WorkflowReport {
    run_at(config, request, notifier, Utc::now()).await
}

/// Run the workflow with an explicit clock for retention.
pub async fn run_at(
    config: &Config,
    request: &RunRequest,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> WorkflowReport {
    let span = tracing::info_span!(
        "backup_run",
        run_id = %Uuid::new_v4(),
        day_folder = %request.day_folder,
        file = %request.filename,
    );

    async move {
        let report = execute(config, request, now).await;
        let outcome = report.outcome();

        match outcome {
            RunOutcome::Success => tracing::info!("Backup run succeeded"),
            RunOutcome::Failure => {
                tracing::error!(exit_code = report.exit_code(), "Backup run failed")
            }
        }

        if let Err(e) = notifier.notify(outcome).await {
            tracing::warn!(error = %e, "Failed to send notification");
        }

        report
    }
    .instrument(span)
    .await
}

/// Report a failure that happened before a run could start, such as an
/// unusable configuration. Returns the exit code for the process.
pub async fn report_startup_failure(error: &BackupError, notifier: &dyn Notifier) -> i32 {
    log_error("configure", error);
    if let Err(e) = notifier.notify(RunOutcome::Failure).await {
        tracing::warn!(error = %e, "Failed to send notification");
    }
    error.exit_code()
}

async fn execute(config: &Config, request: &RunRequest, now: DateTime<Utc>) -> WorkflowReport {
    let mut report = WorkflowReport::default();

    if let Err(e) = request.validate() {
        log_error("validate", &e);
        report.fatal = Some(e);
        return report;
    }

    let client = match connect(config).await {
        Ok(client) => client,
        Err(e) => {
            log_error("authenticate", &e);
            report.fatal = Some(e);
            return report;
        }
    };

    let ctx = match client.resolve(&config.site_name, config.site_selection).await {
        Ok(ctx) => ctx,
        Err(e) => {
            log_error("resolve", &e);
            report.fatal = Some(e);
            return report;
        }
    };

    let upload = match client.ensure_folder(&ctx, &config.backup_folder).await {
        Ok(_) => {
            match local::locate_backup(&config.backup_root, &request.day_folder, &request.filename) {
                Ok(path) => {
                    client
                        .upload(&ctx, &config.backup_folder, &request.day_folder, &path)
                        .await
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    };
    if let Err(e) = &upload {
        log_error("upload", e);
    }
    report.upload = Some(upload);

    if request.skip_retention {
        tracing::info!("Retention skipped");
        return report;
    }

    let prune = client
        .prune_older_than(&ctx, &config.backup_folder, request.retention_days, now)
        .await;
    if let Err(e) = &prune {
        log_error("retention", e);
    }
    report.prune = Some(prune);

    report
}

async fn connect(config: &Config) -> BackupResult<GraphClient> {
    let provider = CredentialProvider::from_config(config)?;
    let token = provider.acquire_token(&config.credentials).await?;
    GraphClient::from_config(config, token)
}

fn log_error(step: &'static str, error: &BackupError) {
    let error_code = error.error_code();
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(step, error = %error, error_type, error_code, "Step failed");
        }
        LogLevel::Warn => {
            tracing::warn!(step, error = %error, error_type, error_code, "Step failed");
        }
        LogLevel::Error => {
            tracing::error!(step, error = %error, error_type, error_code, "Step failed");
        }
    }
}
