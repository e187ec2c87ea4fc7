//! # Reopen Backoff
//!
//! Exponential delay between attempts to reopen a throttled watch stream.
//! Sequence with the defaults: 1s, 2s, 4s, 8s, 16s, 30s (max).
//!
//! This paces reconnections to the API server only. Failed inventory calls are
//! never retried.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReopenBackoff {
    start_ms: u64,
    current_ms: u64,
    max_ms: u64,
}

impl ReopenBackoff {
    #[must_use]
    pub fn new(start_ms: u64, max_ms: u64) -> Self {
        let start_ms = start_ms.min(max_ms);
        Self {
            start_ms,
            current_ms: start_ms,
            max_ms,
        }
    }

    /// Current delay, doubling the next one up to the maximum
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms;
        self.current_ms = self.current_ms.saturating_mul(2).min(self.max_ms);
        Duration::from_millis(delay)
    }

    /// Back to the starting delay after the stream delivers again
    pub fn reset(&mut self) {
        self.current_ms = self.start_ms;
    }
}
