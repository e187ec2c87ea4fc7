//! # Event Stream
//!
//! Resumable stream of Organization lifecycle events.
//!
//! An [`EventSource`] opens a fresh stream from a [`Cursor`]. The stream ends
//! when the server-side watch timeout elapses or the connection drops; the
//! watch loop then reopens it from the last cursor it recorded.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use kube::api::{Api, WatchEvent, WatchParams};
use thiserror::Error;
use tracing::debug;

use crate::constants::INITIAL_RESOURCE_VERSION;
use crate::controller::reconciler::{EventType, ResourceEvent};
use crate::crd::Organization;

/// Position to resume the watch from
///
/// Lives in the watch loop only. It starts at the beginning on every process
/// start and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Default for Cursor {
    fn default() -> Self {
        Self::initial()
    }
}

impl Cursor {
    #[must_use]
    pub fn initial() -> Self {
        Self(INITIAL_RESOURCE_VERSION.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Move to `resource_version`; an empty version leaves the cursor alone
    pub fn advance(&mut self, resource_version: &str) {
        if !resource_version.is_empty() {
            self.0 = resource_version.to_string();
        }
    }

    /// Start over from the beginning
    pub fn reset(&mut self) {
        self.0 = INITIAL_RESOURCE_VERSION.to_string();
    }
}

/// One item read from the stream
#[derive(Debug, Clone)]
pub enum WatchItem {
    Event(ResourceEvent),
    /// Progress marker carrying only a resource version
    Bookmark(String),
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("watch rejected with HTTP {code}: {message}")]
    Api { code: u16, message: String },
    #[error("watch connection failed: {0}")]
    Disconnected(String),
    /// One line of the stream could not be decoded; the stream itself is intact
    #[error("undecodable watch event: {0}")]
    Decode(String),
}

/// Opens streams of Organization events
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn open(
        &self,
        cursor: &Cursor,
    ) -> Result<BoxStream<'static, Result<WatchItem, StreamError>>, StreamError>;
}

/// [`EventSource`] backed by a namespaced Kubernetes watch
pub struct KubeEventSource {
    api: Api<Organization>,
    timeout_secs: u32,
}

impl std::fmt::Debug for KubeEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventSource")
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl KubeEventSource {
    #[must_use]
    pub fn new(api: Api<Organization>, timeout_secs: u32) -> Self {
        Self { api, timeout_secs }
    }
}

#[async_trait]
impl EventSource for KubeEventSource {
    async fn open(
        &self,
        cursor: &Cursor,
    ) -> Result<BoxStream<'static, Result<WatchItem, StreamError>>, StreamError> {
        // Bookmarks are requested by default
        let params = WatchParams::default().timeout(self.timeout_secs);
        debug!(resource_version = cursor.as_str(), "watch.stream.opening");

        let stream = self
            .api
            .watch(&params, cursor.as_str())
            .await
            .map_err(stream_error)?;

        Ok(stream.map(convert).boxed())
    }
}

fn convert(item: kube::Result<WatchEvent<Organization>>) -> Result<WatchItem, StreamError> {
    match item {
        Ok(WatchEvent::Added(resource)) => Ok(WatchItem::Event(ResourceEvent::new(
            EventType::Added,
            resource,
        ))),
        Ok(WatchEvent::Modified(resource)) => Ok(WatchItem::Event(ResourceEvent::new(
            EventType::Modified,
            resource,
        ))),
        Ok(WatchEvent::Deleted(resource)) => Ok(WatchItem::Event(ResourceEvent::new(
            EventType::Deleted,
            resource,
        ))),
        Ok(WatchEvent::Bookmark(bookmark)) => {
            Ok(WatchItem::Bookmark(bookmark.metadata.resource_version))
        }
        Ok(WatchEvent::Error(e)) => Err(StreamError::Api {
            code: e.code,
            message: e.message,
        }),
        Err(e) => Err(stream_error(e)),
    }
}

fn stream_error(error: kube::Error) -> StreamError {
    match error {
        kube::Error::Api(e) => StreamError::Api {
            code: e.code,
            message: e.message.clone(),
        },
        kube::Error::SerdeError(e) => StreamError::Decode(e.to_string()),
        other => StreamError::Disconnected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::OrganizationSpec;
    use serde_json::json;

    #[test]
    fn test_cursor_lifecycle() {
        let mut cursor = Cursor::initial();
        assert_eq!(cursor.as_str(), "0");

        cursor.advance("1041");
        assert_eq!(cursor.as_str(), "1041");

        cursor.advance("");
        assert_eq!(cursor.as_str(), "1041");

        cursor.reset();
        assert_eq!(cursor, Cursor::default());
    }

    fn watch_event(value: serde_json::Value) -> WatchEvent<Organization> {
        serde_json::from_value(value).expect("valid watch event")
    }

    #[test]
    fn test_convert_added_event() {
        let item = convert(Ok(watch_event(json!({
            "type": "ADDED",
            "object": {
                "apiVersion": "api.cosmotech.com/v1",
                "kind": "Organization",
                "metadata": { "name": "acme", "resourceVersion": "17" },
                "spec": { "name": "ACME" }
            }
        }))))
        .unwrap();

        match item {
            WatchItem::Event(event) => {
                assert_eq!(event.event_type, EventType::Added);
                assert_eq!(event.cursor, "17");
                assert_eq!(event.resource.spec.name.as_deref(), Some("ACME"));
            }
            other => panic!("expected an event, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_event_without_resource_version_keeps_cursor() {
        let item = convert(Ok(watch_event(json!({
            "type": "DELETED",
            "object": {
                "apiVersion": "api.cosmotech.com/v1",
                "kind": "Organization",
                "metadata": { "name": "acme" },
                "spec": {}
            }
        }))))
        .unwrap();

        let WatchItem::Event(event) = item else {
            panic!("expected an event");
        };
        assert_eq!(event.event_type, EventType::Deleted);
        assert_eq!(event.cursor, "");

        let mut cursor = Cursor::initial();
        cursor.advance("5");
        cursor.advance(&event.cursor);
        assert_eq!(cursor.as_str(), "5");
    }

    #[test]
    fn test_convert_bookmark() {
        let item = convert(Ok(watch_event(json!({
            "type": "BOOKMARK",
            "object": {
                "apiVersion": "api.cosmotech.com/v1",
                "kind": "Organization",
                "metadata": { "resourceVersion": "2048" }
            }
        }))))
        .unwrap();

        match item {
            WatchItem::Bookmark(resource_version) => assert_eq!(resource_version, "2048"),
            other => panic!("expected a bookmark, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_expired_error_keeps_code() {
        let err = convert(Ok(watch_event(json!({
            "type": "ERROR",
            "object": {
                "status": "Failure",
                "message": "too old resource version: 12 (4711)",
                "reason": "Expired",
                "code": 410
            }
        }))))
        .unwrap_err();

        match err {
            StreamError::Api { code, message } => {
                assert_eq!(code, 410);
                assert!(message.contains("too old resource version"));
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_undecodable_line() {
        let serde_error = serde_json::from_str::<OrganizationSpec>(r#"{"id": 7}"#).unwrap_err();
        let err = convert(Err(kube::Error::SerdeError(serde_error))).unwrap_err();
        assert!(matches!(err, StreamError::Decode(_)));
    }
}
