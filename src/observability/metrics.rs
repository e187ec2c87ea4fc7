//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `organization_controller_events_total` - Watch events processed, by event type
//! - `organization_controller_reconcile_errors_total` - Events whose side effects failed
//! - `organization_controller_verification_mismatches_total` - Events ignored because the verification token did not match
//! - `organization_controller_reconcile_duration_seconds` - Duration of event processing
//! - `organization_controller_inventory_operations_total` - Inventory API calls, by operation and outcome
//! - `organization_controller_inventory_operation_duration_seconds` - Duration of inventory API calls
//! - `organization_controller_watch_restarts_total` - Watch stream reopenings, by reason
//! - `organization_controller_undecodable_events_total` - Watch lines skipped because they could not be decoded

use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "organization_controller_events_total",
            "Total number of watch events processed by event type",
        ),
        &["event_type"],
    )
    .expect("Failed to create EVENTS_TOTAL metric - this should never happen")
});

static RECONCILE_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "organization_controller_reconcile_errors_total",
        "Total number of events whose inventory call or patch failed",
    )
    .expect("Failed to create RECONCILE_ERRORS_TOTAL metric - this should never happen")
});

static VERIFICATION_MISMATCHES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "organization_controller_verification_mismatches_total",
        "Total number of events ignored because the verification token did not match",
    )
    .expect("Failed to create VERIFICATION_MISMATCHES_TOTAL metric - this should never happen")
});

static RECONCILE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "organization_controller_reconcile_duration_seconds",
            "Duration of event processing in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILE_DURATION metric - this should never happen")
});

static INVENTORY_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "organization_controller_inventory_operations_total",
            "Total number of inventory API operations by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create INVENTORY_OPERATIONS_TOTAL metric - this should never happen")
});

static INVENTORY_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "organization_controller_inventory_operation_duration_seconds",
            "Duration of inventory API operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 30.0]),
        &["operation"],
    )
    .expect("Failed to create INVENTORY_OPERATION_DURATION metric - this should never happen")
});

static WATCH_RESTARTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "organization_controller_watch_restarts_total",
            "Total number of watch stream restarts by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create WATCH_RESTARTS_TOTAL metric - this should never happen")
});

static UNDECODABLE_EVENTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "organization_controller_undecodable_events_total",
        "Total number of watch lines skipped because they could not be decoded",
    )
    .expect("Failed to create UNDECODABLE_EVENTS_TOTAL metric - this should never happen")
});

/// Register all controller metrics with the shared registry
///
/// # Errors
/// Returns an error if a metric is registered twice
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VERIFICATION_MISMATCHES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILE_DURATION.clone()))?;
    REGISTRY.register(Box::new(INVENTORY_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVENTORY_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(WATCH_RESTARTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UNDECODABLE_EVENTS_TOTAL.clone()))?;

    Ok(())
}

/// Gather everything registered for the `/metrics` endpoint
#[must_use]
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_events(event_type: &str) {
    EVENTS_TOTAL.with_label_values(&[event_type]).inc();
}

pub fn increment_reconcile_errors() {
    RECONCILE_ERRORS_TOTAL.inc();
}

pub fn increment_verification_mismatches() {
    VERIFICATION_MISMATCHES_TOTAL.inc();
}

pub fn observe_reconcile_duration(duration: f64) {
    RECONCILE_DURATION.observe(duration);
}

pub fn record_inventory_operation(operation: &str, outcome: &str, duration: f64) {
    INVENTORY_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    INVENTORY_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_watch_restarts(reason: &str) {
    WATCH_RESTARTS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_undecodable_events() {
    UNDECODABLE_EVENTS_TOTAL.inc();
}
