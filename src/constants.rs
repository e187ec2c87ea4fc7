//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group of the Organization custom resource
pub const ORGANIZATION_GROUP: &str = "api.cosmotech.com";

/// Field manager name used when patching Organization resources
pub const FIELD_MANAGER: &str = "organization-controller";

/// Label written on a resource once its organization has been created upstream.
/// The label value is the organization id assigned by the inventory API.
pub const DEFAULT_CHALLENGE_LABEL_KEY: &str = "challenge";

/// Resource version that asks the API server for a watch from the beginning
/// (synthetic Added events for everything that currently exists).
pub const INITIAL_RESOURCE_VERSION: &str = "0";

/// Header carrying a static inventory API key
pub const API_KEY_HEADER: &str = "X-CSM-API-KEY";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default server-side watch timeout (seconds)
/// Kept below the API server's 5 minute cap so the stream ends cleanly and reopens
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 290;

/// Largest watch timeout the client accepts (seconds)
pub const MAX_WATCH_TIMEOUT_SECS: u32 = 294;

/// Default exponential backoff starting value (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Consecutive failures to open the watch stream before the loop gives up
pub const DEFAULT_MAX_STREAM_OPEN_FAILURES: u32 = 10;

/// Default timeout for a single inventory API request (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
