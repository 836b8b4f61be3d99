//! Microsoft Graph client for the backup workflow.
//!
//! `GraphClient` carries the bearer token and the retry policy, builds a fresh
//! header set for every request, and exposes thin GET/POST/DELETE helpers.
//! Step-specific operations (site/drive resolution, folder ensure, upload,
//! retention) live in sibling modules as further `impl GraphClient` blocks.
//!
//! Token acquisition is separate (`auth::CredentialProvider`) because it runs
//! before any client exists and is never retried.

pub mod auth;
pub mod folders;
pub mod resolver;
pub mod retention;
pub mod retry;
pub mod upload;

use std::future::Future;
use std::time::Duration;

use odbackup_core::models::AccessToken;
use odbackup_core::{BackupError, BackupResult, Config};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use auth::CredentialProvider;
pub use retention::{expired_entries, retention_cutoff};
pub use retry::RetryPolicy;

/// One page of a Graph collection response.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// HTTP client for the Graph API, bound to one access token.
#[derive(Clone, Debug)]
pub struct GraphClient {
    client: Client,
    base_url: String,
    token: AccessToken,
    retry: RetryPolicy,
}

impl GraphClient {
    pub fn new(
        base_url: &str,
        token: AccessToken,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> BackupResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackupError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            retry,
        })
    }

    /// Create a client from configuration and a freshly acquired token.
    pub fn from_config(config: &Config, token: AccessToken) -> BackupResult<Self> {
        Self::new(
            &config.graph_base_url,
            token,
            RetryPolicy::from(&config.retry),
            config.http_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Absolute URL for a path relative to the API root. Absolute URLs (such as
    /// `@odata.nextLink`) pass through unchanged.
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// New request carrying only the headers every Graph call needs.
    pub(crate) fn authorized(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, self.token.bearer())
            .header(ACCEPT, "application/json")
    }

    /// Send through the retry policy; `build` is invoked once per attempt.
    pub(crate) async fn send<F>(&self, build: F) -> BackupResult<Response>
    where
        F: FnMut() -> BackupResult<RequestBuilder>,
    {
        self.retry.send(build).await
    }

    /// Send through the retry policy with an async per-attempt builder.
    pub(crate) async fn send_with<F, Fut>(&self, build: F) -> BackupResult<Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BackupResult<RequestBuilder>>,
    {
        self.retry.send_with(build).await
    }

    /// GET with optional query parameters. Any non-retryable status is returned.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> BackupResult<Response> {
        let url = self.build_url(path);
        self.send(|| {
            let mut request = self.authorized(Method::GET, &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            Ok(request)
        })
        .await
    }

    /// GET and deserialize a JSON body, failing on any non-success status.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> BackupResult<T> {
        let response = self.get(path, query).await?;
        read_json(response).await
    }

    /// POST a JSON body. Any non-retryable status is returned.
    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> BackupResult<Response> {
        let url = self.build_url(path);
        self.send(|| Ok(self.authorized(Method::POST, &url).json(body)))
            .await
    }

    /// DELETE request. Any non-retryable status is returned.
    pub async fn delete(&self, path: &str) -> BackupResult<Response> {
        let url = self.build_url(path);
        self.send(|| Ok(self.authorized(Method::DELETE, &url)))
            .await
    }
}

/// Consume a response: non-success becomes `BackupError::Http`, otherwise the
/// body is parsed as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> BackupResult<T> {
    let status = response.status();
    if !status.is_success() {
        let (status, body) = failure_parts(response).await;
        return Err(BackupError::Http { status, body });
    }

    response
        .json()
        .await
        .map_err(|e| BackupError::Decode(format!("Failed to parse response as JSON: {}", e)))
}

/// Status code and body text of a failed response, for diagnostics.
pub(crate) async fn failure_parts(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    (status, body)
}

/// Split an error into (status, body) so a step can re-wrap it in its own variant.
pub(crate) fn status_and_body(err: BackupError) -> (Option<u16>, String) {
    match err {
        BackupError::Transient { status, body, .. } => (status, body),
        BackupError::Http { status, body } => (Some(status), body),
        other => (other.status(), other.to_string()),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::client_for;
    use mockito::Server;

    #[test]
    fn build_url_joins_and_passes_absolute_links() {
        let client = super::GraphClient::new(
            "https://graph.example/v1.0/",
            odbackup_core::models::AccessToken::new("t"),
            super::RetryPolicy::default(),
            std::time::Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.build_url("sites/abc/drive"),
            "https://graph.example/v1.0/sites/abc/drive"
        );
        assert_eq!(
            client.build_url("https://graph.example/v1.0/next?page=2"),
            "https://graph.example/v1.0/next?page=2"
        );
    }

    #[tokio::test]
    async fn every_request_carries_bearer_and_no_stray_content_type() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer test-token")
            .match_header("content-type", mockito::Matcher::Missing)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server);
        let value: serde_json::Value = client.get_json("ping", &[]).await.unwrap();
        assert!(value.is_object());
        mock.assert_async().await;
    }
}
