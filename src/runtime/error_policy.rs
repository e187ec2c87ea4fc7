//! # Error Policy
//!
//! Classification of watch stream errors and the pause before reopening.
//!
//! Nothing here touches the inventory API. These rules only decide how the
//! watch loop gets its stream back.

use std::time::Duration;

use tracing::{error, warn, Instrument};

use super::backoff::ReopenBackoff;
use super::event_stream::StreamError;
use crate::constants::ORGANIZATION_GROUP;

/// Kind of watch failure, used for the reopen strategy and the restart metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: RBAC revoked or service account token expired
    Unauthorized,
    /// 410: the cursor is older than the API server keeps
    Expired,
    /// 429: API server storage is (re)initializing
    TooManyRequests,
    /// 404: the CRD or the namespace is missing
    NotFound,
    Other,
}

impl WatchErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchErrorKind::Unauthorized => "unauthorized",
            WatchErrorKind::Expired => "expired",
            WatchErrorKind::TooManyRequests => "too-many-requests",
            WatchErrorKind::NotFound => "not-found",
            WatchErrorKind::Other => "error",
        }
    }
}

/// Classify a stream error, by status code when there is one
#[must_use]
pub fn classify(error: &StreamError) -> WatchErrorKind {
    match error {
        StreamError::Api { code: 401, .. } => WatchErrorKind::Unauthorized,
        StreamError::Api { code: 410, .. } => WatchErrorKind::Expired,
        StreamError::Api { code: 429, .. } => WatchErrorKind::TooManyRequests,
        StreamError::Api { code: 404, .. } => WatchErrorKind::NotFound,
        StreamError::Api { message, .. } | StreamError::Disconnected(message) => {
            classify_message(message)
        }
        StreamError::Decode(_) => WatchErrorKind::Other,
    }
}

// Check 404 before 401: a plain-text 404 body can surface inside a larger
// error chain that also mentions authorization.
fn classify_message(message: &str) -> WatchErrorKind {
    let is_not_found = message.contains("ObjectNotFound")
        || message.contains("404")
        || message.contains("not found");
    if is_not_found {
        WatchErrorKind::NotFound
    } else if message.contains("401") || message.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if message.contains("410")
        || message.contains("too old resource version")
        || message.contains("Expired")
        || message.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if message.contains("429")
        || message.contains("storage is (re)initializing")
        || message.contains("TooManyRequests")
    {
        WatchErrorKind::TooManyRequests
    } else {
        WatchErrorKind::Other
    }
}

/// Log a stream error and wait before the stream is reopened
///
/// Returns the classification so the caller can reset its cursor on
/// [`WatchErrorKind::Expired`].
pub async fn handle_watch_stream_error(
    stream_error: &StreamError,
    backoff: &mut ReopenBackoff,
    watch_restart_delay: Duration,
) -> WatchErrorKind {
    let kind = classify(stream_error);
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %stream_error,
        error_type = kind.as_str()
    );
    let delay = error_span.in_scope(|| match kind {
        WatchErrorKind::Unauthorized => {
            error!(
                "Watch authentication failed (401 Unauthorized) - check that the controller's \
                 Role still grants watch and patch on organizations.{}",
                ORGANIZATION_GROUP
            );
            watch_restart_delay
        }
        WatchErrorKind::Expired => {
            warn!(error_type = "410", "watch.error.resource_version_expired");
            warn!(
                "Watch resource version expired (410), restarting from the beginning; \
                 replayed Added events are matched against existing organizations"
            );
            Duration::ZERO
        }
        WatchErrorKind::TooManyRequests => {
            let delay = backoff.next_delay();
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart...",
                delay.as_millis()
            );
            delay
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Organization resources not found (404) - is the CRD installed and the \
                 namespace present? Error: {}",
                stream_error
            );
            watch_restart_delay
        }
        WatchErrorKind::Other => {
            error!("Watch stream error: {}", stream_error);
            watch_restart_delay
        }
    });

    if !delay.is_zero() {
        tokio::time::sleep(delay).instrument(error_span).await;
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: u16, message: &str) -> StreamError {
        StreamError::Api {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_by_code() {
        assert_eq!(classify(&api(401, "")), WatchErrorKind::Unauthorized);
        assert_eq!(classify(&api(410, "")), WatchErrorKind::Expired);
        assert_eq!(classify(&api(429, "")), WatchErrorKind::TooManyRequests);
        assert_eq!(classify(&api(404, "")), WatchErrorKind::NotFound);
        assert_eq!(classify(&api(500, "etcdserver: leader changed")), WatchErrorKind::Other);
    }

    #[test]
    fn test_classify_by_message() {
        assert_eq!(
            classify(&StreamError::Disconnected(
                "too old resource version: 12 (4711)".to_string()
            )),
            WatchErrorKind::Expired
        );
        assert_eq!(
            classify(&api(500, "storage is (re)initializing")),
            WatchErrorKind::TooManyRequests
        );
        assert_eq!(
            classify(&StreamError::Disconnected("connection reset by peer".to_string())),
            WatchErrorKind::Other
        );
    }

    #[test]
    fn test_not_found_wins_over_unauthorized() {
        assert_eq!(
            classify(&StreamError::Disconnected(
                "Unauthorized: invalid type: integer `404`".to_string()
            )),
            WatchErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_expired_reopens_without_delay() {
        let mut backoff = ReopenBackoff::new(1000, 30_000);
        let start = std::time::Instant::now();
        let kind =
            handle_watch_stream_error(&api(410, "Gone"), &mut backoff, Duration::from_secs(60))
                .await;
        assert_eq!(kind, WatchErrorKind::Expired);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_other_errors_wait_restart_delay() {
        let mut backoff = ReopenBackoff::new(1000, 30_000);
        let start = std::time::Instant::now();
        let kind = handle_watch_stream_error(
            &StreamError::Disconnected("connection reset by peer".to_string()),
            &mut backoff,
            Duration::from_millis(20),
        )
        .await;
        assert_eq!(kind, WatchErrorKind::Other);
        assert!(start.elapsed() >= Duration::from_millis(20));
        // The throttling backoff is untouched by other errors
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_decode_errors_are_not_classified_by_message() {
        assert_eq!(
            classify(&StreamError::Decode("invalid type: integer `404`".to_string())),
            WatchErrorKind::Other
        );
    }

    #[tokio::test]
    async fn test_throttling_advances_backoff() {
        let mut backoff = ReopenBackoff::new(1, 100);
        handle_watch_stream_error(&api(429, ""), &mut backoff, Duration::ZERO).await;
        handle_watch_stream_error(&api(429, ""), &mut backoff, Duration::ZERO).await;
        assert_eq!(backoff.next_delay(), Duration::from_millis(4));
    }
}
