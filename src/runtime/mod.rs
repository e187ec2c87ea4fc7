//! # Runtime
//!
//! Controller runtime: initialization, the watch loop and stream error handling.
//!
//! - `initialization`: process bootstrap
//! - `event_stream`: resumable Organization event streams
//! - `watch_loop`: sequential event processing and stream reopening
//! - `error_policy`: watch error classification
//! - `backoff`: reopen pacing after throttling

pub mod backoff;
pub mod error_policy;
pub mod event_stream;
pub mod initialization;
pub mod watch_loop;

pub use event_stream::{Cursor, EventSource, KubeEventSource, StreamError, WatchItem};
pub use initialization::{initialize, InitializationResult};
pub use watch_loop::{run_watch_loop, WatchSettings};
