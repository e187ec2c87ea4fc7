//! # Custom Resource Definitions
//!
//! CRD types for the Organization Controller.
//!
//! - `spec.rs` - the `Organization` resource and its identity-carrying spec

mod spec;

pub use spec::{Organization, OrganizationSpec};
