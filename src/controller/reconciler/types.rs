//! # Types
//!
//! Core types for the reconciler.

use thiserror::Error;

use crate::crd::Organization;
use crate::provider::InventoryError;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("inventory call failed: {0}")]
    Inventory(#[from] InventoryError),
    #[error("patch-back failed: {0}")]
    Patch(#[from] PatchError),
}

/// Failure to persist an annotation on the resource
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("resource has no name")]
    MissingName,
    #[error("failed to patch Organization {namespace}/{name}: {source}")]
    Kube {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// Lifecycle event type as delivered by the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl EventType {
    /// Wire name, also used as the metrics label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Added => "ADDED",
            EventType::Modified => "MODIFIED",
            EventType::Deleted => "DELETED",
        }
    }
}

/// One lifecycle event for an Organization
#[derive(Debug, Clone)]
pub struct ResourceEvent {
    pub event_type: EventType,
    pub resource: Organization,
    /// Resource version to resume the stream from once this event is handled
    pub cursor: String,
}

impl ResourceEvent {
    #[must_use]
    pub fn new(event_type: EventType, resource: Organization) -> Self {
        let cursor = resource.metadata.resource_version.clone().unwrap_or_default();
        Self {
            event_type,
            resource,
            cursor,
        }
    }
}

/// Why an event produced no side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Modified or Deleted without `spec.id`
    MissingId,
    /// `spec.sha` does not match the token of `spec.id`
    VerificationMismatch,
    /// The inventory API answered 404 to a create
    CreateNotFound,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingId => "missing-id",
            SkipReason::VerificationMismatch => "verification-mismatch",
            SkipReason::CreateNotFound => "create-not-found",
        }
    }
}

/// What processing one event amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Created upstream and annotated with the full identity
    Created { id: String },
    /// Already present upstream; annotated with the id only
    Adopted { id: String },
    Updated { id: String },
    Deleted { id: String },
    Skipped(SkipReason),
    /// An inventory call or the patch-back failed; already logged
    Failed,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created { .. } => "created",
            ReconcileOutcome::Adopted { .. } => "adopted",
            ReconcileOutcome::Updated { .. } => "updated",
            ReconcileOutcome::Deleted { .. } => "deleted",
            ReconcileOutcome::Skipped(reason) => reason.as_str(),
            ReconcileOutcome::Failed => "failed",
        }
    }
}
