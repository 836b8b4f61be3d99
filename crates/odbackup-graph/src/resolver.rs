//! Site and drive resolution.
//!
//! A site is found by display-name search; its default document library is
//! the drive every later step works against. Site absence and drive absence
//! are distinct errors.

use odbackup_core::models::{DriveContext, DriveReference, SiteReference, SiteSelection};
use odbackup_core::{BackupError, BackupResult};
use reqwest::StatusCode;

use crate::{failure_parts, read_json, status_and_body, GraphClient, Page};

impl GraphClient {
    /// Search sites by name and pick one according to `selection`.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_site(
        &self,
        name: &str,
        selection: SiteSelection,
    ) -> BackupResult<SiteReference> {
        let page: Page<SiteReference> = self
            .get_json("sites", &[("search", name)])
            .await
            .map_err(|e| resolution_error(format!("site '{}'", name), e))?;

        let count = page.value.len();
        if count > 1 && selection == SiteSelection::Unique {
            return Err(BackupError::AmbiguousSite {
                name: name.to_string(),
                count,
            });
        }

        let site = page
            .value
            .into_iter()
            .next()
            .ok_or_else(|| BackupError::SiteNotFound(name.to_string()))?;

        if count > 1 {
            tracing::warn!(
                matches = count,
                site_id = %site.id,
                "Site search matched several sites, using the first result"
            );
        }

        tracing::info!(site_id = %site.id, "Site resolved");
        Ok(site)
    }

    /// Look up the default drive of a resolved site.
    #[tracing::instrument(skip(self, site), fields(site_id = %site.id))]
    pub async fn resolve_drive(&self, site: &SiteReference) -> BackupResult<DriveReference> {
        let path = format!("sites/{}/drive", site.id);
        let response = self
            .get(&path, &[])
            .await
            .map_err(|e| resolution_error(format!("drive of site '{}'", site.id), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            let (_, body) = failure_parts(response).await;
            tracing::error!(body = %body, "Site has no drive");
            return Err(BackupError::DriveNotFound(site.id.clone()));
        }

        let drive: DriveReference = read_json(response)
            .await
            .map_err(|e| resolution_error(format!("drive of site '{}'", site.id), e))?;

        if drive.id.is_empty() {
            return Err(BackupError::DriveNotFound(site.id.clone()));
        }

        tracing::info!(drive_id = %drive.id, "Drive resolved");
        Ok(drive)
    }

    /// Resolve site then drive, producing the context for later steps.
    pub async fn resolve(&self, site_name: &str, selection: SiteSelection) -> BackupResult<DriveContext> {
        let site = self.resolve_site(site_name, selection).await?;
        let drive = self.resolve_drive(&site).await?;
        Ok(DriveContext::new(site, drive))
    }
}

fn resolution_error(target: String, err: BackupError) -> BackupError {
    let (status, body) = status_and_body(err);
    BackupError::Resolution {
        target,
        status,
        body,
    }
}
