//! # Controller
//!
//! Core controller modules for the Organization Controller.
//!
//! - `verification`: verification token derived from an organization id
//! - `annotator`: identity write-back onto Organization resources
//! - `reconciler`: per-event dispatch to the inventory API
//! - `server`: HTTP server for metrics and health checks

pub mod annotator;
pub mod reconciler;
pub mod server;
pub mod verification;
