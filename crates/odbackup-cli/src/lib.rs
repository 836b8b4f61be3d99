//! Backup workflow wiring for the `odbackup` binary.

pub mod local;
pub mod workflow;

pub use workflow::{report_startup_failure, run, run_at, RunRequest, WorkflowReport};
