//! # Reconciler
//!
//! Turns Organization lifecycle events into inventory API calls.
//!
//! - `types`: events, outcomes and errors
//! - `reconcile`: per-event dispatch and verification
//! - `patcher`: identity write-back onto the resource

pub mod patcher;
pub mod reconcile;
pub mod types;

pub use patcher::{KubePatcher, ResourcePatcher};
pub use reconcile::Reconciler;
pub use types::{
    EventType, PatchError, ReconcileOutcome, ReconcilerError, ResourceEvent, SkipReason,
};
