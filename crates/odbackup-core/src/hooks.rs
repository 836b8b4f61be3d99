//! Hooks and traits for outbound integrations
//!
//! The workflow reports its final outcome through the `Notifier` trait so the
//! core does not depend on any particular chat service. The infra crate
//! provides the webhook implementation.

use async_trait::async_trait;

use crate::models::RunOutcome;

/// Receives the final outcome of a backup run, for human notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the outcome. Errors are reported to the caller and never retried.
    async fn notify(&self, outcome: RunOutcome) -> Result<(), String>;
}

/// No-op implementation for when no webhook is configured
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _outcome: RunOutcome) -> Result<(), String> {
        Ok(())
    }
}
