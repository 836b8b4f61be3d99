//! Configuration module
//!
//! Runtime settings come from the process environment (optionally seeded from a
//! `.env` file). Required credentials and names fail loudly at startup; unset
//! tuning knobs fall back to defaults, malformed ones are rejected.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BackupError;
use crate::models::SiteSelection;

// Common constants
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_BACKUP_ROOT: &str = "/backup/dbbackup";
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
const DEFAULT_REDIRECT_URI: &str = "http://localhost";
const DEFAULT_WEBHOOK_USERNAME: &str = "SupportBot";
const HTTP_TIMEOUT_SECS: u64 = 300;
const RETRY_MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_FACTOR: f64 = 0.3;

/// Service-principal credentials for the client-credentials grant.
#[derive(Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Retry tuning for data-plane calls.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            backoff_factor: RETRY_BACKOFF_FACTOR,
        }
    }
}

/// Chat webhook used for human notification.
#[derive(Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Role id mentioned on failure (`<@&id>`).
    pub mention_role: Option<String>,
    pub username: String,
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &"***")
            .field("mention_role", &self.mention_role)
            .field("username", &self.username)
            .finish()
    }
}

impl WebhookConfig {
    /// Webhook settings only, read from the process environment. Available
    /// even when the rest of the configuration is unusable.
    pub fn from_env() -> Option<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// `None` when `BACKUP_WH` is unset or empty.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        get("BACKUP_WH").map(|url| WebhookConfig {
            url,
            mention_role: get("WH_USER"),
            username: get("WH_USERNAME").unwrap_or_else(|| DEFAULT_WEBHOOK_USERNAME.to_string()),
        })
    }
}

/// Parse an optional value, keeping `default` only when the key is unset.
fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, BackupError> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| BackupError::Config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub site_name: String,
    pub site_selection: SiteSelection,
    pub backup_folder: String,
    pub backup_root: PathBuf,
    pub retention_days: u32,
    pub webhook: Option<WebhookConfig>,
    pub graph_base_url: String,
    pub authority_url: String,
    pub http_timeout: Duration,
    pub retry: RetrySettings,
    pub json_logs: bool,
}

impl Config {
    /// Load from the process environment after reading `.env` if present.
    pub fn from_env() -> Result<Self, BackupError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BackupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| BackupError::Config(format!("{} must be set", key)))
        };

        let credentials = Credentials {
            tenant_id: required("OD_TENANT_ID")?,
            client_id: required("OD_CLIENT_ID")?,
            client_secret: required("OD_CLIENT_SECRET")?,
            redirect_uri: get("OD_REDIRECT").unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        };

        let site_name = get("OD_SITE_NAME")
            .or_else(|| get("OD_SITE_URL"))
            .ok_or_else(|| BackupError::Config("OD_SITE_NAME must be set".to_string()))?;

        let site_selection = match get("OD_SITE_SELECTION") {
            Some(raw) => raw
                .parse()
                .map_err(|e: anyhow::Error| BackupError::Config(e.to_string()))?,
            None => SiteSelection::default(),
        };

        let retention_days = match get("BACKUP_RETENTION_DAYS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                BackupError::Config("BACKUP_RETENTION_DAYS must be a positive integer".to_string())
            })?,
            None => DEFAULT_RETENTION_DAYS,
        };

        let webhook = WebhookConfig::from_lookup(&lookup);

        let http_timeout_secs =
            parse_or(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?;

        let retry = RetrySettings {
            max_attempts: parse_or(
                get("RETRY_MAX_ATTEMPTS"),
                "RETRY_MAX_ATTEMPTS",
                RETRY_MAX_ATTEMPTS,
            )?,
            backoff_factor: parse_or(
                get("RETRY_BACKOFF_FACTOR"),
                "RETRY_BACKOFF_FACTOR",
                RETRY_BACKOFF_FACTOR,
            )?,
        };

        let config = Config {
            credentials,
            site_name,
            site_selection,
            backup_folder: required("DB_BACKUP_FOLDER")?,
            backup_root: PathBuf::from(
                get("BACKUP_ROOT").unwrap_or_else(|| DEFAULT_BACKUP_ROOT.to_string()),
            ),
            retention_days,
            webhook,
            graph_base_url: get("GRAPH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            authority_url: get("OD_AUTHORITY_URL")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_URL.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            retry,
            json_logs: get("LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BackupError> {
        if self.retry.max_attempts == 0 {
            return Err(BackupError::Config(
                "RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 0.0 {
            return Err(BackupError::Config(
                "RETRY_BACKOFF_FACTOR must be a non-negative number".to_string(),
            ));
        }

        if self.retention_days == 0 {
            return Err(BackupError::Config(
                "BACKUP_RETENTION_DAYS must be at least 1".to_string(),
            ));
        }

        if self.backup_folder.contains('/') || self.backup_folder.contains('\\') {
            return Err(BackupError::Config(
                "DB_BACKUP_FOLDER must be a single folder name".to_string(),
            ));
        }

        for (key, url) in [
            ("GRAPH_BASE_URL", &self.graph_base_url),
            ("OD_AUTHORITY_URL", &self.authority_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(BackupError::Config(format!(
                    "{} must be an http(s) URL",
                    key
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("OD_TENANT_ID", "tenant"),
            ("OD_CLIENT_ID", "client"),
            ("OD_CLIENT_SECRET", "secret"),
            ("OD_SITE_NAME", "Backups"),
            ("DB_BACKUP_FOLDER", "db"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, BackupError> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_vars_missing() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.retention_days, DEFAULT_RETENTION_DAYS);
        assert_eq!(config.site_selection, SiteSelection::First);
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.graph_base_url, DEFAULT_GRAPH_BASE_URL);
        assert_eq!(config.backup_root, PathBuf::from(DEFAULT_BACKUP_ROOT));
        assert_eq!(config.credentials.redirect_uri, "http://localhost");
        assert!(config.webhook.is_none());
        assert!(!config.json_logs);
    }

    #[test]
    fn missing_secret_is_config_error() {
        let mut vars = base_env();
        vars.remove("OD_CLIENT_SECRET");
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, BackupError::Config(ref m) if m.contains("OD_CLIENT_SECRET")));
    }

    #[test]
    fn site_url_is_accepted_as_legacy_alias() {
        let mut vars = base_env();
        vars.remove("OD_SITE_NAME");
        vars.insert("OD_SITE_URL", "LegacySite");
        assert_eq!(load(&vars).unwrap().site_name, "LegacySite");
    }

    #[test]
    fn webhook_and_overrides_are_read() {
        let mut vars = base_env();
        vars.insert("BACKUP_WH", "https://chat.example/hook");
        vars.insert("WH_USER", "1234");
        vars.insert("BACKUP_RETENTION_DAYS", "14");
        vars.insert("OD_SITE_SELECTION", "unique");
        vars.insert("LOG_FORMAT", "JSON");
        let config = load(&vars).unwrap();
        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.mention_role.as_deref(), Some("1234"));
        assert_eq!(webhook.username, "SupportBot");
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.site_selection, SiteSelection::Unique);
        assert!(config.json_logs);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut vars = base_env();
        vars.insert("BACKUP_RETENTION_DAYS", "-1");
        assert!(load(&vars).is_err());

        let mut vars = base_env();
        vars.insert("BACKUP_RETENTION_DAYS", "0");
        assert!(load(&vars).is_err());

        let mut vars = base_env();
        vars.insert("RETRY_MAX_ATTEMPTS", "0");
        assert!(load(&vars).is_err());

        let mut vars = base_env();
        vars.insert("DB_BACKUP_FOLDER", "db/nested");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn malformed_tuning_values_name_the_key() {
        for key in ["HTTP_TIMEOUT_SECS", "RETRY_MAX_ATTEMPTS", "RETRY_BACKOFF_FACTOR"] {
            let mut vars = base_env();
            vars.insert(key, "three");
            let err = load(&vars).unwrap_err();
            assert!(
                matches!(err, BackupError::Config(ref m) if m.contains(key)),
                "{key}: {err:?}"
            );
        }

        let mut vars = base_env();
        vars.insert("HTTP_TIMEOUT_SECS", "45");
        vars.insert("RETRY_MAX_ATTEMPTS", "5");
        vars.insert("RETRY_BACKOFF_FACTOR", "1.5");
        let config = load(&vars).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(45));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_factor, 1.5);
    }

    #[test]
    fn webhook_is_readable_without_credentials() {
        let vars = HashMap::from([
            ("BACKUP_WH", "https://chat.example/hook"),
            ("WH_USERNAME", "Backups"),
        ]);
        assert!(load(&vars).is_err());

        let webhook =
            WebhookConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(webhook.url, "https://chat.example/hook");
        assert_eq!(webhook.username, "Backups");
        assert!(webhook.mention_role.is_none());

        assert!(WebhookConfig::from_lookup(|_| Some("  ".to_string())).is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = load(&base_env()).unwrap();
        let rendered = format!("{:?}", config.credentials);
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("***"));
    }
}
