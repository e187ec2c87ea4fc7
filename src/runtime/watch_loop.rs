//! # Watch Loop
//!
//! Reads Organization events one at a time and hands each to the reconciler.
//!
//! The cursor is local to [`run_watch_loop`]. It moves to an event's resource
//! version once that event has been processed, whatever the outcome, and to a
//! bookmark's version when one arrives. When the stream ends or fails it is
//! reopened from the cursor, except after a 410 where the cursor starts over.
//! A line that cannot be decoded is logged and skipped without reopening.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::backoff::ReopenBackoff;
use super::error_policy::{handle_watch_stream_error, WatchErrorKind};
use super::event_stream::{Cursor, EventSource, StreamError, WatchItem};
use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::ServerState;
use crate::observability::metrics;

/// Loop pacing, taken from [`ControllerConfig`]
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub restart_delay: Duration,
    pub restart_delay_after_end: Duration,
    pub backoff_start_ms: u64,
    pub backoff_max_ms: u64,
    /// Consecutive failures to open the stream before giving up
    pub max_open_failures: u32,
}

impl From<&ControllerConfig> for WatchSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            restart_delay: config.watch_restart_delay_duration(),
            restart_delay_after_end: config.watch_restart_delay_after_end_duration(),
            backoff_start_ms: config.backoff_start_ms,
            backoff_max_ms: config.backoff_max_ms,
            max_open_failures: config.max_stream_open_failures,
        }
    }
}

/// Run the watch loop until shutdown or until the stream cannot be reopened
///
/// Shutdown is signalled by clearing `server_state`'s readiness.
///
/// # Errors
/// Returns an error after `max_open_failures` consecutive failed attempts to
/// open the stream. The process is expected to exit and be restarted.
pub async fn run_watch_loop(
    source: &dyn EventSource,
    reconciler: &Reconciler,
    settings: &WatchSettings,
    server_state: Arc<ServerState>,
) -> anyhow::Result<()> {
    info!("Starting controller watch loop...");

    let mut cursor = Cursor::initial();
    let mut backoff = ReopenBackoff::new(settings.backoff_start_ms, settings.backoff_max_ms);
    let max_open_failures = settings.max_open_failures.max(1);
    let mut open_failures: u32 = 0;

    loop {
        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let mut stream = match source.open(&cursor).await {
            Ok(stream) => {
                open_failures = 0;
                stream
            }
            Err(e) => {
                open_failures += 1;
                if open_failures >= max_open_failures {
                    error!(
                        error = %e,
                        attempts = open_failures,
                        "watch.stream.unrecoverable"
                    );
                    return Err(anyhow::anyhow!(
                        "failed to open the Organization watch {open_failures} times in a row: {e}"
                    ));
                }
                restart_after_error(&e, &mut cursor, &mut backoff, settings).await;
                continue;
            }
        };

        debug!(resource_version = cursor.as_str(), "watch.stream.opened");

        let mut stream_error: Option<StreamError> = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(WatchItem::Event(event)) => {
                    reconciler.reconcile(&event).await;
                    cursor.advance(&event.cursor);
                    backoff.reset();
                }
                Ok(WatchItem::Bookmark(resource_version)) => {
                    debug!(resource_version = resource_version.as_str(), "watch.bookmark");
                    cursor.advance(&resource_version);
                }
                // The line is lost but the stream is intact. Reopening would
                // deliver the same line again.
                Err(StreamError::Decode(message)) => {
                    error!(
                        error = message.as_str(),
                        resource_version = cursor.as_str(),
                        "watch.event.undecodable"
                    );
                    metrics::increment_undecodable_events();
                }
                Err(e) => {
                    stream_error = Some(e);
                    break;
                }
            }

            if !server_state.is_ready() {
                break;
            }
        }

        if !server_state.is_ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        match stream_error {
            Some(e) => restart_after_error(&e, &mut cursor, &mut backoff, settings).await,
            None => {
                metrics::increment_watch_restarts("stream-ended");
                debug!(
                    "Watch stream ended, reopening from {} in {:?}",
                    cursor.as_str(),
                    settings.restart_delay_after_end
                );
                tokio::time::sleep(settings.restart_delay_after_end).await;
            }
        }
    }

    info!("Controller stopped gracefully");
    Ok(())
}

async fn restart_after_error(
    stream_error: &StreamError,
    cursor: &mut Cursor,
    backoff: &mut ReopenBackoff,
    settings: &WatchSettings,
) {
    let kind = handle_watch_stream_error(stream_error, backoff, settings.restart_delay).await;
    metrics::increment_watch_restarts(kind.as_str());
    if kind == WatchErrorKind::Expired {
        warn!(
            previous = cursor.as_str(),
            "Resetting watch cursor to the beginning"
        );
        cursor.reset();
    }
}
