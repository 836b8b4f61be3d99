//! odbackup core library
//!
//! Domain models, error taxonomy, configuration and hook traits shared by the
//! Graph client, infrastructure and CLI crates.

pub mod config;
pub mod error;
pub mod hooks;
pub mod models;

// Re-export commonly used types
pub use config::{Config, Credentials, RetrySettings, WebhookConfig};
pub use error::{BackupError, BackupResult, ErrorMetadata, LogLevel, EXIT_SUCCESS};
pub use hooks::{NoOpNotifier, Notifier};
