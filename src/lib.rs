//! Organization Controller Library
//!
//! Keeps the external organization inventory API in sync with `Organization`
//! custom resources: lifecycle events from a namespaced watch become create,
//! update and delete calls, and created organizations are written back onto
//! their resources together with a verification token.
//!
//! ## Quick Start
//!
//! ```rust
//! use organization_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

// Re-export modules so they can be tested
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
