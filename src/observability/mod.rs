//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//!
//! Tracing is plain `tracing` + `tracing-subscriber`, set up in
//! [`crate::runtime::initialization`].

pub mod metrics;
