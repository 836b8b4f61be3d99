//! Idempotent creation of the backup folder under the drive root.
//!
//! Day folders below it are created implicitly by the upload path.

use odbackup_core::models::{encode_segment, DriveContext, EnsureOutcome};
use odbackup_core::{BackupError, BackupResult};
use reqwest::StatusCode;
use serde_json::json;

use crate::{failure_parts, status_and_body, GraphClient};

impl GraphClient {
    /// Make sure `name` exists as a folder directly under the drive root.
    ///
    /// An existence check GET short-circuits the common case. Creation uses
    /// `conflictBehavior: fail`, so a folder created concurrently between the
    /// lookup and the POST comes back as 409 and still counts as present.
    #[tracing::instrument(skip(self, ctx), fields(drive_id = %ctx.drive_id()))]
    pub async fn ensure_folder(&self, ctx: &DriveContext, name: &str) -> BackupResult<EnsureOutcome> {
        let lookup_path = format!(
            "drives/{}/root:/{}",
            encode_segment(ctx.drive_id()),
            encode_segment(name)
        );

        match self.get(&lookup_path, &[]).await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Folder already exists");
                return Ok(EnsureOutcome::AlreadyExists);
            }
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {}
            Ok(response) => {
                let (status, _) = failure_parts(response).await;
                tracing::warn!(status, "Folder lookup failed, attempting create");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Folder lookup failed, attempting create");
            }
        }

        let create_path = format!("drives/{}/root/children", encode_segment(ctx.drive_id()));
        let body = json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });

        let response = self
            .post_json(&create_path, &body)
            .await
            .map_err(|e| ensure_error(name, e))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Folder created");
            return Ok(EnsureOutcome::Created);
        }
        if status == StatusCode::CONFLICT {
            tracing::info!("Folder created concurrently, treating as present");
            return Ok(EnsureOutcome::AlreadyExists);
        }

        let (status, body) = failure_parts(response).await;
        tracing::error!(status, "Folder create rejected");
        Err(BackupError::FolderEnsure {
            folder: name.to_string(),
            status: Some(status),
            body,
        })
    }
}

fn ensure_error(folder: &str, err: BackupError) -> BackupError {
    let (status, body) = status_and_body(err);
    BackupError::FolderEnsure {
        folder: folder.to_string(),
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{client_for, drive_context};
    use mockito::{Matcher, Server};
    use odbackup_core::models::EnsureOutcome;
    use odbackup_core::BackupError;

    const CREATED: &str = r#"{"id":"f-1","name":"db","folder":{"childCount":0}}"#;

    #[tokio::test]
    async fn test_missing_folder_is_created() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/drives/drive-1/root:/db")
            .with_status(404)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/drives/drive-1/root/children")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "db",
                "folder": {},
                "@microsoft.graph.conflictBehavior": "fail"
            })))
            .with_status(201)
            .with_body(CREATED)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client
            .ensure_folder(&drive_context(), "db")
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::Created);
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_ensure_does_not_create_again() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/drives/drive-1/root:/db")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/drives/drive-1/root:/db")
            .with_status(200)
            .with_body(CREATED)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/drives/drive-1/root/children")
            .with_status(201)
            .with_body(CREATED)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let ctx = drive_context();
        let first = client.ensure_folder(&ctx, "db").await.unwrap();
        let second = client.ensure_folder(&ctx, "db").await.unwrap();

        assert_eq!(first, EnsureOutcome::Created);
        assert_eq!(second, EnsureOutcome::AlreadyExists);
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_conflict_on_create_counts_as_existing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/drives/drive-1/root:/db")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("POST", "/drives/drive-1/root/children")
            .with_status(409)
            .with_body(r#"{"error":{"code":"nameAlreadyExists"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let outcome = client
            .ensure_folder(&drive_context(), "db")
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_rejected_create_is_folder_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/drives/drive-1/root:/db")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("POST", "/drives/drive-1/root/children")
            .with_status(403)
            .with_body("accessDenied")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .ensure_folder(&drive_context(), "db")
            .await
            .unwrap_err();

        match err {
            BackupError::FolderEnsure {
                folder,
                status,
                body,
            } => {
                assert_eq!(folder, "db");
                assert_eq!(status, Some(403));
                assert_eq!(body, "accessDenied");
            }
            other => panic!("expected folder error, got {other:?}"),
        }
    }
}
