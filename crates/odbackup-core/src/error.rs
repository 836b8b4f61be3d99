//! Error types module
//!
//! Every failure a backup run can hit is a `BackupError` variant. The
//! `ErrorMetadata` trait lets an error describe how it should be reported:
//! machine-readable code, process exit code, whether it aborts the run, and
//! the log level to use.
//!
//! Remote failures keep the HTTP status and response body so the log line and
//! the notification are actionable.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions
    Debug,
    /// Warning level - for recoverable issues such as a single failed deletion
    Warn,
    /// Error level - for failures that stop a step
    Error,
}

/// Process exit code for a run that finished without failures.
pub const EXIT_SUCCESS: i32 = 0;

/// Metadata describing how an error should be reported.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "AUTH_ERROR")
    fn error_code(&self) -> &'static str;

    /// Process exit code the binary returns for this failure
    fn exit_code(&self) -> i32;

    /// Whether this error aborts the whole run
    fn is_fatal(&self) -> bool;

    /// Whether retrying the same call may succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Local file error: {0}")]
    LocalFile(String),

    #[error("Authentication failed (status {}): {}", display_status(.status), .body)]
    Auth { status: Option<u16>, body: String },

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Site search for '{name}' matched {count} sites, expected exactly one")]
    AmbiguousSite { name: String, count: usize },

    #[error("Drive not found for site: {0}")]
    DriveNotFound(String),

    #[error("Failed to resolve {} (status {}): {}", .target, display_status(.status), .body)]
    Resolution {
        target: String,
        status: Option<u16>,
        body: String,
    },

    #[error("Failed to ensure folder '{}' (status {}): {}", .folder, display_status(.status), .body)]
    FolderEnsure {
        folder: String,
        status: Option<u16>,
        body: String,
    },

    #[error("Request still failing after {} attempts (last status {}): {}", .attempts, display_status(.status), .body)]
    Transient {
        attempts: u32,
        status: Option<u16>,
        body: String,
    },

    #[error("Upload rejected (status {status}): {body}")]
    Upload { status: u16, body: String },

    #[error("Failed to list retention candidates (status {}): {}", display_status(.status), .body)]
    Retention { status: Option<u16>, body: String },

    #[error("Failed to delete '{}' (status {}): {}", .name, display_status(.status), .body)]
    RetentionItem {
        name: String,
        status: Option<u16>,
        body: String,
    },

    #[error("Unexpected response (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

pub type BackupResult<T> = Result<T, BackupError>;

impl From<io::Error> for BackupError {
    fn from(err: io::Error) -> Self {
        BackupError::LocalFile(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        BackupError::Decode(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, exit_code, fatal, recoverable, log_level).
fn backup_error_static_metadata(err: &BackupError) -> (&'static str, i32, bool, bool, LogLevel) {
    match err {
        BackupError::Config(_) => ("CONFIG_ERROR", 2, true, false, LogLevel::Error),
        BackupError::InvalidInput(_) => ("INVALID_INPUT", 2, true, false, LogLevel::Error),
        BackupError::Auth { .. } => ("AUTH_ERROR", 10, true, false, LogLevel::Error),
        BackupError::SiteNotFound(_) => ("SITE_NOT_FOUND", 11, true, false, LogLevel::Error),
        BackupError::AmbiguousSite { .. } => ("AMBIGUOUS_SITE", 11, true, false, LogLevel::Error),
        BackupError::DriveNotFound(_) => ("DRIVE_NOT_FOUND", 12, true, false, LogLevel::Error),
        BackupError::Resolution { .. } => ("RESOLUTION_ERROR", 17, true, true, LogLevel::Error),
        BackupError::FolderEnsure { .. } => ("FOLDER_ENSURE_ERROR", 13, false, false, LogLevel::Error),
        BackupError::LocalFile(_) => ("LOCAL_FILE_ERROR", 14, false, false, LogLevel::Error),
        BackupError::Transient { .. } => ("TRANSIENT_UPLOAD_ERROR", 15, false, true, LogLevel::Error),
        BackupError::Upload { .. } => ("UPLOAD_ERROR", 15, false, false, LogLevel::Error),
        BackupError::Retention { .. } => ("RETENTION_ERROR", 16, false, true, LogLevel::Error),
        BackupError::RetentionItem { .. } => ("RETENTION_ITEM_ERROR", EXIT_SUCCESS, false, true, LogLevel::Warn),
        BackupError::Http { .. } => ("HTTP_ERROR", 1, false, false, LogLevel::Error),
        BackupError::Transport(_) => ("TRANSPORT_ERROR", 1, false, true, LogLevel::Error),
        BackupError::Decode(_) => ("DECODE_ERROR", 1, false, false, LogLevel::Error),
    }
}

impl BackupError {
    /// Get the error type name for log fields
    pub fn error_type(&self) -> &'static str {
        match self {
            BackupError::Config(_) => "Config",
            BackupError::InvalidInput(_) => "InvalidInput",
            BackupError::LocalFile(_) => "LocalFile",
            BackupError::Auth { .. } => "Auth",
            BackupError::SiteNotFound(_) => "SiteNotFound",
            BackupError::AmbiguousSite { .. } => "AmbiguousSite",
            BackupError::DriveNotFound(_) => "DriveNotFound",
            BackupError::Resolution { .. } => "Resolution",
            BackupError::FolderEnsure { .. } => "FolderEnsure",
            BackupError::Transient { .. } => "Transient",
            BackupError::Upload { .. } => "Upload",
            BackupError::Retention { .. } => "Retention",
            BackupError::RetentionItem { .. } => "RetentionItem",
            BackupError::Http { .. } => "Http",
            BackupError::Transport(_) => "Transport",
            BackupError::Decode(_) => "Decode",
        }
    }

    /// HTTP status attached to the error, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackupError::Auth { status, .. }
            | BackupError::Resolution { status, .. }
            | BackupError::FolderEnsure { status, .. }
            | BackupError::Transient { status, .. }
            | BackupError::Retention { status, .. }
            | BackupError::RetentionItem { status, .. } => *status,
            BackupError::Upload { status, .. } | BackupError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl ErrorMetadata for BackupError {
    fn error_code(&self) -> &'static str {
        backup_error_static_metadata(self).0
    }

    fn exit_code(&self) -> i32 {
        backup_error_static_metadata(self).1
    }

    fn is_fatal(&self) -> bool {
        backup_error_static_metadata(self).2
    }

    fn is_recoverable(&self) -> bool {
        backup_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        backup_error_static_metadata(self).4
    }
}
