//! Bounded retry with exponential backoff for data-plane calls.
//!
//! Only failures that happened before any response arrived (refused or
//! dropped connections, timeouts, interrupted bodies) and a fixed set of
//! gateway statuses are retried. Any other response is handed back to the
//! caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use odbackup_core::{BackupError, BackupResult, RetrySettings};
use reqwest::{RequestBuilder, Response, StatusCode};

const MAX_BACKOFF_SECS: u64 = 120;
const RETRY_STATUSES: [u16; 3] = [500, 502, 504];

/// Retry configuration for Graph calls
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub max_backoff: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            backoff_factor: settings.backoff_factor,
            max_backoff: Duration::from_secs(MAX_BACKOFF_SECS),
            retry_statuses: RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Sleep before the attempt following failed attempt `attempt` (1-based):
    /// `backoff_factor * 2^(attempt - 1)` seconds, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if !secs.is_finite() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(secs).min(self.max_backoff)
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// No response was received: the connection failed, timed out, or was
    /// closed while the request was in flight.
    fn is_retryable_error(err: &reqwest::Error) -> bool {
        err.is_connect() || err.is_timeout() || err.is_request() || err.is_body()
    }

    /// Send a request, rebuilding it for every attempt.
    ///
    /// A non-retryable response of any status is returned as `Ok`; the caller
    /// decides what it means. Exhausting the budget yields
    /// `BackupError::Transient` with the last status and body seen.
    pub async fn send<F>(&self, mut build: F) -> BackupResult<Response>
    where
        F: FnMut() -> BackupResult<RequestBuilder>,
    {
        self.send_with(|| std::future::ready(build())).await
    }

    /// Like [`RetryPolicy::send`], with an async builder. Streamed bodies use
    /// this to open a fresh source for each attempt.
    pub async fn send_with<F, Fut>(&self, mut build: F) -> BackupResult<Response>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BackupResult<RequestBuilder>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let request = build().await?;

            match request.send().await {
                Ok(response) if self.is_retryable_status(response.status()) => {
                    let status = response.status();
                    if attempt >= self.max_attempts {
                        let body = response.text().await.unwrap_or_default();
                        tracing::error!(
                            attempt,
                            status = status.as_u16(),
                            "Request failed, retry budget exhausted"
                        );
                        return Err(BackupError::Transient {
                            attempts: attempt,
                            status: Some(status.as_u16()),
                            body,
                        });
                    }
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        status = status.as_u16(),
                        "Request returned retryable status"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if Self::is_retryable_error(&e) => {
                    if attempt >= self.max_attempts {
                        tracing::error!(attempt, error = %e, "Request failed, retry budget exhausted");
                        return Err(BackupError::Transient {
                            attempts: attempt,
                            status: None,
                            body: e.to_string(),
                        });
                    }
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Request failed with transient error"
                    );
                }
                Err(e) => return Err(BackupError::Transport(e.to_string())),
            }

            let delay = self.backoff(attempt);
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
            tokio::time::sleep(delay).await;
        }
    }
}
