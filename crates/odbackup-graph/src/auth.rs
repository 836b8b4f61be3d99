//! Client-credentials token acquisition.
//!
//! A failed token request is fatal for the run and is not retried: bad
//! credentials will not get better on the next attempt.

use std::time::Duration;

use odbackup_core::models::AccessToken;
use odbackup_core::{BackupError, BackupResult, Config, Credentials};
use reqwest::Client;
use serde::Deserialize;

const GRAPH_RESOURCE: &str = "https://graph.microsoft.com";
const GRAPH_SCOPE: &str = "Sites.ReadWrite.All Files.ReadWrite.All";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Exchanges service credentials for a Graph bearer token.
#[derive(Clone, Debug)]
pub struct CredentialProvider {
    client: Client,
    authority_url: String,
}

impl CredentialProvider {
    pub fn new(authority_url: &str, timeout: Duration) -> BackupResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackupError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            authority_url: authority_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> BackupResult<Self> {
        Self::new(&config.authority_url, config.http_timeout)
    }

    pub fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/token", self.authority_url, tenant_id)
    }

    /// Request a token with the client-credentials grant.
    #[tracing::instrument(skip_all, fields(tenant_id = %credentials.tenant_id))]
    pub async fn acquire_token(&self, credentials: &Credentials) -> BackupResult<AccessToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("resource", GRAPH_RESOURCE),
            ("scope", GRAPH_SCOPE),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", credentials.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url(&credentials.tenant_id))
            .form(&form)
            .send()
            .await
            .map_err(|e| BackupError::Auth {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(status = status.as_u16(), "Token request rejected");
            return Err(BackupError::Auth {
                status: Some(status.as_u16()),
                body,
            });
        }

        let payload: TokenResponse = response.json().await.map_err(|e| BackupError::Auth {
            status: Some(status.as_u16()),
            body: format!("Malformed token response: {}", e),
        })?;

        match payload.access_token {
            Some(token) if !token.is_empty() => {
                tracing::info!(
                    token_type = payload.token_type.as_deref().unwrap_or("unknown"),
                    "Access token acquired"
                );
                Ok(AccessToken::new(token))
            }
            _ => Err(BackupError::Auth {
                status: Some(status.as_u16()),
                body: "Token response did not contain an access_token".to_string(),
            }),
        }
    }
}
