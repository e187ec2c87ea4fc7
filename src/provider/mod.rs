//! # Inventory Provider
//!
//! Client side of the external organization inventory API.
//!
//! - `auth`: authorization header providers (static key or bearer token)
//! - `rest`: reqwest implementation of [`InventoryProvider`]
//!
//! A lookup that comes back 404 is an answer, not a failure, and is returned
//! as `Ok(None)`. Everything else that goes wrong is an [`InventoryError`]:
//! the caller logs it and moves on, nothing here retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crd::OrganizationSpec;

pub mod auth;
pub mod rest;

pub use auth::{ApiKeyAuth, AuthHeader, AuthHeaderProvider, BearerTokenAuth};
pub use rest::InventoryREST;

/// An organization as known to the inventory API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEntity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Transient failure of an inventory call
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to obtain authorization header: {0}")]
    Auth(String),
    #[error("{operation} request failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} refused: '{id}' cannot be used as an organization id")]
    InvalidId {
        operation: &'static str,
        id: String,
    },
    #[error("{operation} returned an unreadable body: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

/// Operations the controller performs against the inventory API
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Fetch an organization; `Ok(None)` when the API answers 404
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ExternalEntity>, InventoryError>;

    /// Create an organization from the declared spec; `Ok(None)` when the API answers 404
    async fn create(&self, data: &OrganizationSpec)
        -> Result<Option<ExternalEntity>, InventoryError>;

    /// Replace the organization's attributes with the declared spec
    async fn update(&self, id: &str, data: &OrganizationSpec) -> Result<(), InventoryError>;

    /// Remove the organization; an organization that is already gone counts as removed
    async fn delete(&self, id: &str) -> Result<(), InventoryError>;
}
