//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.
//!
//! Unlike the tuning knobs, the namespace, the inventory API URL and the
//! authentication settings have no sensible default. Loading fails fast with a
//! [`ConfigError`] naming the first missing variable so the pod crash-loops
//! with a readable message instead of starting half-configured.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use zeroize::Zeroizing;

use super::{process_env, var_non_empty, var_or_default};
use crate::constants::{
    DEFAULT_BACKOFF_MAX_MS, DEFAULT_BACKOFF_START_MS, DEFAULT_CHALLENGE_LABEL_KEY,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_STREAM_OPEN_FAILURES,
    DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
    DEFAULT_WATCH_TIMEOUT_SECS, MAX_WATCH_TIMEOUT_SECS,
};

/// Startup configuration failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is missing in the controller environment")]
    MissingVariable(&'static str),
    #[error("API_URL must be an http(s) URL, got '{0}'")]
    InvalidApiUrl(String),
    #[error(
        "WATCH_TIMEOUT_SECS must be between 1 and {max}, got {0}",
        max = MAX_WATCH_TIMEOUT_SECS
    )]
    InvalidWatchTimeout(u32),
}

/// How requests to the inventory API are authenticated
#[derive(Clone)]
pub enum AuthConfig {
    /// Static key sent as `X-CSM-API-KEY`
    ApiKey(Zeroizing<String>),
    /// Client-secret credential exchanged for a bearer token
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: Zeroizing<String>,
        scope: String,
    },
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::ApiKey(_) => f.debug_tuple("ApiKey").field(&"***").finish(),
            AuthConfig::ClientSecret {
                tenant_id,
                client_id,
                scope,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .field("scope", scope)
                .finish(),
        }
    }
}

impl AuthConfig {
    /// Short name used in logs
    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            AuthConfig::ApiKey(_) => "api-key",
            AuthConfig::ClientSecret { .. } => "bearer-token",
        }
    }
}

/// Controller-level configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace whose Organization resources are watched
    pub namespace: String,
    /// Base URL of the inventory API (no trailing slash)
    pub api_url: String,
    /// Inventory API authentication
    pub auth: AuthConfig,
    /// Label key written on resources after their organization is created
    pub challenge_label_key: String,
    /// Server-side timeout requested for each watch (seconds)
    pub watch_timeout_secs: u32,
    /// Delay before reopening the watch after an error (seconds)
    pub watch_restart_delay_secs: u64,
    /// Delay before reopening the watch after it ends normally (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Reopen backoff starting value after a 429 (milliseconds)
    pub backoff_start_ms: u64,
    /// Reopen backoff maximum value (milliseconds)
    pub backoff_max_ms: u64,
    /// Consecutive failures to open the watch before the loop gives up
    pub max_stream_open_failures: u32,
    /// Timeout of a single inventory request (seconds)
    pub http_timeout_secs: u64,
}

impl ControllerConfig {
    /// Load and validate configuration from environment variables
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when a required variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    /// Load and validate configuration through an arbitrary variable lookup
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when a required variable is missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace =
            var_non_empty(&lookup, "NAMESPACE").ok_or(ConfigError::MissingVariable("NAMESPACE"))?;
        let api_url =
            var_non_empty(&lookup, "API_URL").ok_or(ConfigError::MissingVariable("API_URL"))?;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }
        let api_url = api_url.trim_end_matches('/').to_string();
        let auth = auth_from_lookup(&lookup)?;
        let watch_timeout_secs =
            var_or_default(&lookup, "WATCH_TIMEOUT_SECS", DEFAULT_WATCH_TIMEOUT_SECS);
        if watch_timeout_secs == 0 || watch_timeout_secs > MAX_WATCH_TIMEOUT_SECS {
            return Err(ConfigError::InvalidWatchTimeout(watch_timeout_secs));
        }

        Ok(Self {
            namespace,
            api_url,
            auth,
            challenge_label_key: var_non_empty(&lookup, "CHALLENGE_LABEL_KEY")
                .unwrap_or_else(|| DEFAULT_CHALLENGE_LABEL_KEY.to_string()),
            watch_timeout_secs,
            watch_restart_delay_secs: var_or_default(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: var_or_default(
                &lookup,
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            backoff_start_ms: var_or_default(&lookup, "BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: var_or_default(&lookup, "BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            max_stream_open_failures: var_or_default(
                &lookup,
                "MAX_STREAM_OPEN_FAILURES",
                DEFAULT_MAX_STREAM_OPEN_FAILURES,
            ),
            http_timeout_secs: var_or_default(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            ),
        })
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// A non-empty `API_KEY` selects static key authentication; otherwise the
/// client-secret variables are all required.
fn auth_from_lookup<F>(lookup: &F) -> Result<AuthConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = var_non_empty(lookup, "API_KEY") {
        return Ok(AuthConfig::ApiKey(Zeroizing::new(key)));
    }

    let require =
        |key: &'static str| var_non_empty(lookup, key).ok_or(ConfigError::MissingVariable(key));

    Ok(AuthConfig::ClientSecret {
        tenant_id: require("AZURE_TENANT_ID")?,
        client_id: require("AZURE_CLIENT_ID")?,
        client_secret: Zeroizing::new(require("AZURE_CLIENT_SECRET")?),
        scope: require("API_SCOPE")?,
    })
}
