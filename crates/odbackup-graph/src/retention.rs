//! Age-based pruning of day folders under the backup folder.
//!
//! Ages are counted in whole UTC calendar days: with a window of `N` days an
//! entry created on day `D` is deleted once `today - D >= N`. Deletion is
//! best-effort per item; one stuck entry never stops the rest of the pass.

use chrono::{DateTime, Duration, TimeZone, Utc};
use odbackup_core::models::{encode_segment, DriveContext, PruneFailure, PruneReport, RemoteFolderEntry};
use odbackup_core::{BackupError, BackupResult};
use reqwest::StatusCode;

use crate::{failure_parts, status_and_body, GraphClient, Page};

/// Entries created strictly before the returned instant are expired.
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    let start_of_day = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(now);
    start_of_day - Duration::days(i64::from(retention_days) - 1)
}

/// Folders created before `cutoff`, in listing order. Loose files under the
/// backup folder are never expired.
pub fn expired_entries(entries: &[RemoteFolderEntry], cutoff: DateTime<Utc>) -> Vec<&RemoteFolderEntry> {
    entries
        .iter()
        .filter(|entry| entry.is_folder() && entry.created_date_time < cutoff)
        .collect()
}

impl GraphClient {
    /// All immediate children of the backup folder, across every page.
    #[tracing::instrument(skip(self, ctx), fields(drive_id = %ctx.drive_id()))]
    pub async fn list_children(
        &self,
        ctx: &DriveContext,
        folder: &str,
    ) -> BackupResult<Vec<RemoteFolderEntry>> {
        let mut next = Some(format!(
            "drives/{}/root:/{}:/children",
            encode_segment(ctx.drive_id()),
            encode_segment(folder)
        ));
        let mut entries = Vec::new();

        while let Some(path) = next {
            let page: Page<RemoteFolderEntry> =
                self.get_json(&path, &[]).await.map_err(listing_error)?;
            entries.extend(page.value);
            next = page.next_link;
        }

        tracing::debug!(count = entries.len(), "Listed backup folder");
        Ok(entries)
    }

    /// Delete one drive item. An item that is already gone counts as deleted.
    pub async fn delete_item(&self, ctx: &DriveContext, entry: &RemoteFolderEntry) -> BackupResult<()> {
        let path = format!(
            "drives/{}/items/{}",
            encode_segment(ctx.drive_id()),
            encode_segment(&entry.id)
        );

        let response = self.delete(&path).await.map_err(|e| {
            let (status, body) = status_and_body(e);
            BackupError::RetentionItem {
                name: entry.name.clone(),
                status,
                body,
            }
        })?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        let (status, body) = failure_parts(response).await;
        Err(BackupError::RetentionItem {
            name: entry.name.clone(),
            status: Some(status),
            body,
        })
    }

    /// Delete every day folder under `folder` older than the retention window.
    #[tracing::instrument(skip(self, ctx, now), fields(drive_id = %ctx.drive_id()))]
    pub async fn prune_older_than(
        &self,
        ctx: &DriveContext,
        folder: &str,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> BackupResult<PruneReport> {
        let entries = self.list_children(ctx, folder).await?;
        let cutoff = retention_cutoff(now, retention_days);
        let expired = expired_entries(&entries, cutoff);

        let mut report = PruneReport {
            retained: entries.len() - expired.len(),
            ..PruneReport::default()
        };

        tracing::info!(
            cutoff = %cutoff,
            total = entries.len(),
            expired = expired.len(),
            "Applying retention"
        );

        for entry in expired {
            match self.delete_item(ctx, entry).await {
                Ok(()) => {
                    tracing::info!(name = %entry.name, created = %entry.created_date_time, "Deleted expired entry");
                    report.deleted.push(entry.name.clone());
                }
                Err(e) => {
                    tracing::warn!(name = %entry.name, error = %e, "Failed to delete expired entry, continuing");
                    report.failures.push(PruneFailure {
                        id: entry.id.clone(),
                        name: entry.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            deleted = report.deleted_count(),
            failed = report.failures.len(),
            retained = report.retained,
            "Retention complete"
        );
        Ok(report)
    }
}

fn listing_error(err: BackupError) -> BackupError {
    let (status, body) = status_and_body(err);
    BackupError::Retention { status, body }
}
