//! Chat webhook notifier.
//!
//! Posts a short form-encoded message (`username`, `content`) to a
//! Discord-compatible webhook. Failures mention the configured role.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use odbackup_core::models::RunOutcome;
use odbackup_core::{Config, NoOpNotifier, Notifier, WebhookConfig};
use reqwest::Client;

const WEBHOOK_TIMEOUT_SECS: u64 = 30;
const SUCCESS_MESSAGE: &str = "Database backup completed successfully.";
const FAILURE_MESSAGE: &str = "Database backup failed, please check logs.";

/// Delivers run outcomes to a chat webhook.
#[derive(Clone)]
pub struct ChatWebhookNotifier {
    client: Client,
    url: String,
    mention_role: Option<String>,
    username: String,
}

impl ChatWebhookNotifier {
    pub fn new(webhook: &WebhookConfig) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Failed to create webhook client: {}", e))?;

        Ok(Self {
            client,
            url: webhook.url.clone(),
            mention_role: webhook.mention_role.clone(),
            username: webhook.username.clone(),
        })
    }

    /// Create the notifier from config. Returns `None` if no webhook is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        Self::from_webhook(config.webhook.as_ref())
    }

    /// Create the notifier from webhook settings alone.
    pub fn from_webhook(webhook: Option<&WebhookConfig>) -> Option<Self> {
        let webhook = webhook?;
        match Self::new(webhook) {
            Ok(notifier) => {
                tracing::info!(username = %webhook.username, "Webhook notifier initialized");
                Some(notifier)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Webhook notifier disabled");
                None
            }
        }
    }

    /// Message body for an outcome.
    pub fn message(&self, outcome: RunOutcome) -> String {
        match outcome {
            RunOutcome::Success => SUCCESS_MESSAGE.to_string(),
            RunOutcome::Failure => match &self.mention_role {
                Some(role) => format!("{} <@&{}>", FAILURE_MESSAGE, role),
                None => FAILURE_MESSAGE.to_string(),
            },
        }
    }
}

#[async_trait]
impl Notifier for ChatWebhookNotifier {
    async fn notify(&self, outcome: RunOutcome) -> Result<(), String> {
        let content = self.message(outcome);
        let form = [("username", self.username.as_str()), ("content", content.as_str())];

        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| format!("Webhook request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Webhook returned {}: {}", status.as_u16(), body));
        }

        tracing::info!(outcome = ?outcome, "Notification sent");
        Ok(())
    }
}

/// The configured notifier, or a no-op when no webhook is set.
pub fn notifier_from_config(config: &Config) -> Arc<dyn Notifier> {
    notifier_for(config.webhook.as_ref())
}

/// Notifier for bare webhook settings; used when the full config failed to load.
pub fn notifier_for(webhook: Option<&WebhookConfig>) -> Arc<dyn Notifier> {
    match ChatWebhookNotifier::from_webhook(webhook) {
        Some(notifier) => Arc::new(notifier),
        None => Arc::new(NoOpNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn webhook(url: String, role: Option<&str>) -> WebhookConfig {
        WebhookConfig {
            url,
            mention_role: role.map(str::to_string),
            username: "SupportBot".to_string(),
        }
    }

    #[test]
    fn test_failure_message_mentions_role() {
        let notifier =
            ChatWebhookNotifier::new(&webhook("http://localhost/hook".into(), Some("42"))).unwrap();
        assert_eq!(
            notifier.message(RunOutcome::Failure),
            "Database backup failed, please check logs. <@&42>"
        );
        assert_eq!(
            notifier.message(RunOutcome::Success),
            "Database backup completed successfully."
        );
    }

    #[test]
    fn test_failure_message_without_role() {
        let notifier =
            ChatWebhookNotifier::new(&webhook("http://localhost/hook".into(), None)).unwrap();
        assert_eq!(
            notifier.message(RunOutcome::Failure),
            "Database backup failed, please check logs."
        );
    }

    #[tokio::test]
    async fn test_notify_posts_form() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "SupportBot".into()),
                Matcher::UrlEncoded(
                    "content".into(),
                    "Database backup failed, please check logs. <@&42>".into(),
                ),
            ]))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let notifier =
            ChatWebhookNotifier::new(&webhook(format!("{}/hook", server.url()), Some("42"))).unwrap();
        notifier.notify(RunOutcome::Failure).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_webhook_falls_back_to_no_op() {
        assert!(ChatWebhookNotifier::from_webhook(None).is_none());
        notifier_for(None).notify(RunOutcome::Failure).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_webhook_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(400)
            .with_body("bad form")
            .create_async()
            .await;

        let notifier =
            ChatWebhookNotifier::new(&webhook(format!("{}/hook", server.url()), None)).unwrap();
        let err = notifier.notify(RunOutcome::Success).await.unwrap_err();
        assert!(err.contains("400"));
    }
}
