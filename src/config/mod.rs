//! # Configuration
//!
//! Controller and server settings loaded from environment variables.
//!
//! - `controller`: watch, inventory API and authentication settings
//! - `server`: metrics/probe HTTP server settings
//!
//! Environment variables are populated from a Secret/ConfigMap using `envFrom`
//! in the deployment. Every loader goes through a lookup function so tests can
//! feed values without touching the process environment.

mod controller;
mod server;

pub use controller::{AuthConfig, ConfigError, ControllerConfig};
pub use server::ServerConfig;

/// Read a variable through `lookup` or return the default value
pub(crate) fn var_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a variable through `lookup`, treating empty values as unset
pub(crate) fn var_non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lookup backed by the process environment
pub(crate) fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
