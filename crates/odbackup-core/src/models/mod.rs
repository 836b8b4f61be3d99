//! Data models for the backup workflow
//!
//! Each sub-module covers one step of a run: the bearer token, the resolved
//! site/drive context, folders under the drive root, the upload target and the
//! overall run outcome.

mod auth;
mod drive;
mod folder;
mod upload;
mod workflow;

pub use auth::AccessToken;
pub use drive::{DriveContext, DriveReference, SiteReference, SiteSelection};
pub use folder::{EnsureOutcome, PruneFailure, PruneReport, RemoteFolderEntry};
pub use upload::{encode_segment, UploadTarget, UploadedItem, GZIP_CONTENT_TYPE};
pub use workflow::RunOutcome;
