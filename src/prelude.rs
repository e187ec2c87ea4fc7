//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use organization_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - CRD types (Organization, OrganizationSpec)
//! - Inventory provider types and trait
//! - Reconciler types
//! - Watch runtime types
//! - Config types

// CRD types - most commonly used
pub use crate::crd::*;

// Inventory provider
pub use crate::provider::{ExternalEntity, InventoryError, InventoryProvider};

// Reconciler types - core controller functionality
pub use crate::controller::annotator::Annotation;
pub use crate::controller::reconciler::{
    EventType, PatchError, ReconcileOutcome, Reconciler, ReconcilerError, ResourceEvent,
    ResourcePatcher, SkipReason,
};
pub use crate::controller::server::ServerState;

// Watch runtime
pub use crate::runtime::{
    run_watch_loop, Cursor, EventSource, StreamError, WatchItem, WatchSettings,
};

// Config types - for configuration management
pub use crate::config::{AuthConfig, ConfigError, ControllerConfig, ServerConfig};
