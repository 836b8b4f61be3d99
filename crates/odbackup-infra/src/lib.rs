//! odbackup infrastructure library
//!
//! Process-level plumbing for the backup binary:
//! - Telemetry initialization (tracing subscriber)
//! - Chat webhook notification

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "webhook")]
pub mod notify;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};

#[cfg(feature = "webhook")]
pub use notify::{notifier_for, notifier_from_config, ChatWebhookNotifier};
