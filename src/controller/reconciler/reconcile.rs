//! # Reconcile
//!
//! Per-event dispatch to the inventory API.
//!
//! | Event    | Condition                              | Inventory call        | Patch-back          |
//! |----------|----------------------------------------|-----------------------|---------------------|
//! | Added    | no `spec.id`, or lookup answers 404    | `create(spec)`        | id, uid, sha, name, label |
//! | Added    | lookup finds the organization          | none                  | id only             |
//! | Modified | `spec.id` present and token matches    | `update(id, spec)`    | none                |
//! | Deleted  | `spec.id` present and token matches    | `delete(id)`          | none                |
//! | Modified/Deleted | no `spec.id` or token mismatch | none                  | none                |
//!
//! Failures never escape [`Reconciler::reconcile`]: they are logged once, with
//! the event type and resource name, and the caller moves on to the next event.

use std::sync::Arc;
use std::time::Instant;

use kube::ResourceExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::patcher::ResourcePatcher;
use super::types::{EventType, ReconcileOutcome, ReconcilerError, ResourceEvent, SkipReason};
use crate::controller::annotator::Annotation;
use crate::controller::verification;
use crate::crd::{Organization, OrganizationSpec};
use crate::observability::metrics;
use crate::provider::InventoryProvider;

/// Reconciler context shared by every event
#[derive(Clone)]
pub struct Reconciler {
    inventory: Arc<dyn InventoryProvider>,
    patcher: Arc<dyn ResourcePatcher>,
    challenge_label_key: String,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("challenge_label_key", &self.challenge_label_key)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        inventory: Arc<dyn InventoryProvider>,
        patcher: Arc<dyn ResourcePatcher>,
        challenge_label_key: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            patcher,
            challenge_label_key: challenge_label_key.into(),
        }
    }

    /// Process one event to completion
    ///
    /// The returned outcome is informational; the caller advances its cursor
    /// regardless of what it says.
    pub async fn reconcile(&self, event: &ResourceEvent) -> ReconcileOutcome {
        let name = event.resource.name_any();
        let reconcile_span = info_span!(
            "controller.watch.reconcile",
            resource.name = name.as_str(),
            resource.namespace = %event.resource.namespace().unwrap_or_default(),
            resource.version = event.cursor.as_str(),
            event_type = event.event_type.as_str()
        );

        async move {
            let start = Instant::now();
            metrics::increment_events(event.event_type.as_str());
            debug!(resource.name = name.as_str(), "watch.event.received");

            let outcome = match self.dispatch(event).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        resource.name = name.as_str(),
                        event_type = event.event_type.as_str(),
                        error = %e,
                        "watch.event.reconciliation_failed"
                    );
                    metrics::increment_reconcile_errors();
                    ReconcileOutcome::Failed
                }
            };

            if outcome == ReconcileOutcome::Skipped(SkipReason::VerificationMismatch) {
                info!(
                    resource.name = name.as_str(),
                    event_type = event.event_type.as_str(),
                    "Ignoring event: verification token does not match spec.id"
                );
                metrics::increment_verification_mismatches();
            }

            metrics::observe_reconcile_duration(start.elapsed().as_secs_f64());
            debug!(
                resource.name = name.as_str(),
                outcome = outcome.as_str(),
                "watch.event.reconciled"
            );
            outcome
        }
        .instrument(reconcile_span)
        .await
    }

    async fn dispatch(&self, event: &ResourceEvent) -> Result<ReconcileOutcome, ReconcilerError> {
        match event.event_type {
            EventType::Added => self.on_added(&event.resource).await,
            EventType::Modified => {
                let id = match authorized_id(&event.resource.spec) {
                    Ok(id) => id,
                    Err(reason) => return Ok(ReconcileOutcome::Skipped(reason)),
                };
                self.inventory.update(id, &event.resource.spec).await?;
                info!("Updated organization {} in inventory", id);
                Ok(ReconcileOutcome::Updated { id: id.to_string() })
            }
            EventType::Deleted => {
                let id = match authorized_id(&event.resource.spec) {
                    Ok(id) => id,
                    Err(reason) => return Ok(ReconcileOutcome::Skipped(reason)),
                };
                self.inventory.delete(id).await?;
                info!("Deleted organization {} from inventory", id);
                Ok(ReconcileOutcome::Deleted { id: id.to_string() })
            }
        }
    }

    /// Create the organization unless it already exists, then annotate the resource
    ///
    /// A lookup failure aborts the event: creating without knowing whether the
    /// organization exists could duplicate it.
    async fn on_added(&self, resource: &Organization) -> Result<ReconcileOutcome, ReconcilerError> {
        if let Some(id) = resource.spec.organization_id() {
            if let Some(existing) = self.inventory.fetch_by_id(id).await? {
                let annotation = Annotation::identity(existing.id.clone());
                self.patcher.patch(resource, &annotation).await?;
                debug!("Organization {} already exists, recorded id only", existing.id);
                return Ok(ReconcileOutcome::Adopted { id: existing.id });
            }
        }

        let Some(entity) = self.inventory.create(&resource.spec).await? else {
            warn!(
                resource.name = resource.name_any().as_str(),
                "Inventory API answered 404 to create, resource left unannotated"
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::CreateNotFound));
        };

        let annotation = Annotation::created(resource, &entity, &self.challenge_label_key);
        self.patcher.patch(resource, &annotation).await?;
        Ok(ReconcileOutcome::Created { id: entity.id })
    }
}

/// The id a Modified or Deleted event may act on
fn authorized_id(spec: &OrganizationSpec) -> Result<&str, SkipReason> {
    let id = spec.organization_id().ok_or(SkipReason::MissingId)?;
    if verification::verify(spec) {
        Ok(id)
    } else {
        Err(SkipReason::VerificationMismatch)
    }
}
