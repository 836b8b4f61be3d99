//! Streaming upload of one backup archive.

use std::path::Path;

use odbackup_core::models::{DriveContext, UploadTarget, UploadedItem, GZIP_CONTENT_TYPE};
use odbackup_core::{BackupError, BackupResult};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method};
use tokio_util::io::ReaderStream;

use crate::{failure_parts, read_json, GraphClient};

impl GraphClient {
    /// PUT the local file to `{backup_folder}/{day_folder}/{file name}` on the drive.
    ///
    /// Every attempt opens its own handle, so a retry streams the archive from
    /// the start no matter what an earlier attempt left behind. An existing
    /// item at the same path is overwritten.
    #[tracing::instrument(
        skip(self, ctx, local_path),
        fields(drive_id = %ctx.drive_id(), path = %local_path.display())
    )]
    pub async fn upload(
        &self,
        ctx: &DriveContext,
        backup_folder: &str,
        day_folder: &str,
        local_path: &Path,
    ) -> BackupResult<UploadedItem> {
        let filename = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                BackupError::InvalidInput(format!(
                    "Backup file name is not valid UTF-8: {}",
                    local_path.display()
                ))
            })?;

        let size = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| {
                BackupError::LocalFile(format!("Failed to open {}: {}", local_path.display(), e))
            })?
            .len();

        let target = UploadTarget::new(ctx.drive_id(), backup_folder, day_folder, filename);
        let url = self.build_url(&target.content_path());
        tracing::info!(remote = %target.item_path(), size, "Uploading backup");

        let url = url.as_str();
        let response = self
            .send_with(move || async move {
                let file = tokio::fs::File::open(local_path).await.map_err(|e| {
                    BackupError::LocalFile(format!(
                        "Failed to open {}: {}",
                        local_path.display(),
                        e
                    ))
                })?;

                Ok(self
                    .authorized(Method::PUT, url)
                    .header(CONTENT_TYPE, GZIP_CONTENT_TYPE)
                    .header(CONTENT_LENGTH, size)
                    .body(Body::wrap_stream(ReaderStream::new(file))))
            })
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            tracing::error!(status, "Upload rejected");
            return Err(BackupError::Upload { status, body });
        }

        let item: UploadedItem = read_json(response).await?;
        tracing::info!(item_id = %item.id, "Upload complete");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{client_for, drive_context};
    use mockito::Server;
    use odbackup_core::BackupError;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const ITEM: &str = r#"{"id":"item-1","name":"dump.sql.gz","size":11}"#;

    fn archive(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("dump.sql.gz");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"gzip-bytes!").unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_puts_to_exact_content_path() {
        let dir = TempDir::new().unwrap();
        let path = archive(&dir);
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/drives/drive-1/root:/db/2024-01-15/dump.sql.gz:/content")
            .match_header("authorization", "Bearer test-token")
            .match_header("content-type", "application/gzip")
            .match_body("gzip-bytes!")
            .with_status(201)
            .with_body(ITEM)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let item = client
            .upload(&drive_context(), "db", "2024-01-15", &path)
            .await
            .unwrap();

        assert_eq!(item.id, "item-1");
        assert_eq!(item.size, Some(11));
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_succeeds_after_transient_gateway_errors() {
        let dir = TempDir::new().unwrap();
        let path = archive(&dir);
        let mut server = Server::new_async().await;
        let failing = server
            .mock("PUT", "/drives/drive-1/root:/db/2024-01-15/dump.sql.gz:/content")
            .match_body("gzip-bytes!")
            .with_status(502)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("PUT", "/drives/drive-1/root:/db/2024-01-15/dump.sql.gz:/content")
            .match_body("gzip-bytes!")
            .with_status(200)
            .with_body(ITEM)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .upload(&drive_context(), "db", "2024-01-15", &path)
            .await
            .unwrap();

        failing.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_gives_up_after_three_attempts() {
        let dir = TempDir::new().unwrap();
        let path = archive(&dir);
        let mut server = Server::new_async().await;
        let failing = server
            .mock("PUT", "/drives/drive-1/root:/db/2024-01-15/dump.sql.gz:/content")
            .with_status(502)
            .with_body("bad gateway")
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .upload(&drive_context(), "db", "2024-01-15", &path)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BackupError::Transient {
                attempts: 3,
                status: Some(502),
                ..
            }
        ));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_upload_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let path = archive(&dir);
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("PUT", "/drives/drive-1/root:/db/2024-01-15/dump.sql.gz:/content")
            .with_status(507)
            .with_body("quotaLimitReached")
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .upload(&drive_context(), "db", "2024-01-15", &path)
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::Upload { status: 507, ref body } if body == "quotaLimitReached"));
        rejected.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_local_file_is_local_error() {
        let dir = TempDir::new().unwrap();
        let server = Server::new_async().await;
        let client = client_for(&server);

        let err = client
            .upload(
                &drive_context(),
                "db",
                "2024-01-15",
                &dir.path().join("absent.sql.gz"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::LocalFile(_)));
    }
}
