//! # Inventory API Authentication
//!
//! Every inventory request carries one authorization header:
//!
//! - `X-CSM-API-KEY: <key>` when a static key is configured
//! - `Authorization: Bearer <token>` when a client-secret credential is
//!   exchanged for a token
//!
//! Which one is used is decided once at startup from [`AuthConfig`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use azure_core::credentials::{Secret, TokenCredential, TokenRequestOptions};
use azure_identity::ClientSecretCredential;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::InventoryError;
use crate::config::AuthConfig;
use crate::constants::API_KEY_HEADER;

/// A single header name/value pair
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: &'static str,
    pub value: String,
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"***")
            .finish()
    }
}

/// Source of the authorization header attached to inventory requests
#[async_trait]
pub trait AuthHeaderProvider: Send + Sync + fmt::Debug {
    async fn header(&self) -> Result<AuthHeader, InventoryError>;
}

/// Static API key
pub struct ApiKeyAuth {
    key: Zeroizing<String>,
}

impl ApiKeyAuth {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Zeroizing::new(key.into()),
        }
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth").field("key", &"***").finish()
    }
}

#[async_trait]
impl AuthHeaderProvider for ApiKeyAuth {
    async fn header(&self) -> Result<AuthHeader, InventoryError> {
        Ok(AuthHeader {
            name: API_KEY_HEADER,
            value: self.key.to_string(),
        })
    }
}

/// Bearer token obtained from a token credential for a fixed scope
///
/// A token is requested for every call; the credential caches it until it
/// nears expiry.
pub struct BearerTokenAuth {
    credential: Arc<dyn TokenCredential>,
    scope: String,
}

impl BearerTokenAuth {
    #[must_use]
    pub fn new(credential: Arc<dyn TokenCredential>, scope: impl Into<String>) -> Self {
        Self {
            credential,
            scope: scope.into(),
        }
    }
}

impl fmt::Debug for BearerTokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenAuth")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthHeaderProvider for BearerTokenAuth {
    async fn header(&self) -> Result<AuthHeader, InventoryError> {
        let scopes = &[self.scope.as_str()];
        let options = Some(TokenRequestOptions::default());
        let token = self
            .credential
            .get_token(scopes, options)
            .await
            .map_err(|e| InventoryError::Auth(e.to_string()))?;
        debug!(scope = self.scope.as_str(), "inventory.auth.token_acquired");
        Ok(AuthHeader {
            name: "Authorization",
            value: format!("Bearer {}", token.token.secret()),
        })
    }
}

/// Build the header provider selected by the configuration
///
/// # Errors
/// Returns an error if the client-secret credential cannot be constructed.
pub fn from_config(config: &AuthConfig) -> anyhow::Result<Arc<dyn AuthHeaderProvider>> {
    match config {
        AuthConfig::ApiKey(key) => {
            info!("Using static API key authentication for the inventory API");
            Ok(Arc::new(ApiKeyAuth::new(key.as_str())))
        }
        AuthConfig::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
            scope,
        } => {
            info!(
                "Using client secret credential for the inventory API (tenant: {}, client ID: {})",
                tenant_id, client_id
            );
            let credential: Arc<dyn TokenCredential> = ClientSecretCredential::new(
                tenant_id,
                client_id.clone(),
                Secret::new(client_secret.to_string()),
                None,
            )
            .map_err(|e| anyhow::anyhow!("Failed to create ClientSecretCredential: {e}"))?;
            Ok(Arc::new(BearerTokenAuth::new(credential, scope.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_key_header() {
        let header = ApiKeyAuth::new("k-123").header().await.unwrap();
        assert_eq!(header.name, "X-CSM-API-KEY");
        assert_eq!(header.value, "k-123");
    }

    #[test]
    fn test_debug_redacts_key() {
        assert!(!format!("{:?}", ApiKeyAuth::new("k-123")).contains("k-123"));
        let header = AuthHeader {
            name: "Authorization",
            value: "Bearer abc".to_string(),
        };
        assert!(!format!("{header:?}").contains("abc"));
    }
}
