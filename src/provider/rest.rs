//! Inventory API REST Client
//!
//! reqwest implementation of [`InventoryProvider`] against the organization
//! endpoints of the inventory API:
//!
//! - `GET    /organizations/{id}`
//! - `POST   /organizations`
//! - `PATCH  /organizations/{id}`
//! - `DELETE /organizations/{id}`
//!
//! Request bodies are the declared resource spec, serialized as-is. The id is
//! appended as a single percent-encoded path segment, so an id containing `/`
//! or `?` never reaches another route.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use tracing::{debug, info, info_span, Instrument};

use super::{AuthHeaderProvider, ExternalEntity, InventoryError, InventoryProvider};
use crate::crd::OrganizationSpec;
use crate::observability::metrics;

/// Inventory API REST client
pub struct InventoryREST {
    http_client: Client,
    base_url: Url,
    auth: Arc<dyn AuthHeaderProvider>,
}

impl std::fmt::Debug for InventoryREST {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryREST")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl InventoryREST {
    /// Create a client for the API rooted at `base_url`
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a hierarchical URL or the HTTP
    /// client cannot be built
    pub fn new(
        base_url: &str,
        auth: Arc<dyn AuthHeaderProvider>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        // Create HTTP client with rustls (already configured in Cargo.toml)
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid inventory API URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Inventory API URL '{base_url}' cannot carry a path");
        }
        info!("Initializing inventory REST client for {}", base_url);

        Ok(Self {
            http_client,
            base_url,
            auth,
        })
    }

    /// `{base}/organizations`, or `{base}/organizations/{id}` with `id` encoded
    /// as one path segment
    fn organizations_url(&self, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        // Checked in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("organizations");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    /// Build HTTP request with authentication headers
    async fn make_request(
        &self,
        method: Method,
        id: Option<&str>,
        body: Option<&OrganizationSpec>,
    ) -> Result<RequestBuilder, InventoryError> {
        let url = self.organizations_url(id);
        let auth = self.auth.header().await?;

        let mut request = self
            .http_client
            .request(method, url)
            .header(auth.name, auth.value)
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request)
    }

    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        id: Option<&str>,
        body: Option<&OrganizationSpec>,
    ) -> Result<Response, InventoryError> {
        // Dot segments would be dropped from the path and address the collection
        if let Some(id @ ("." | "..")) = id {
            return Err(InventoryError::InvalidId {
                operation,
                id: id.to_string(),
            });
        }
        self.make_request(method, id, body)
            .await?
            .send()
            .await
            .map_err(|e| InventoryError::Transport {
                operation,
                message: e.to_string(),
            })
    }

    async fn entity_or_not_found(
        operation: &'static str,
        response: Response,
    ) -> Result<Option<ExternalEntity>, InventoryError> {
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<ExternalEntity>()
                .await
                .map(Some)
                .map_err(|e| InventoryError::Decode {
                    operation,
                    message: e.to_string(),
                }),
            status => Err(status_error(operation, status, response).await),
        }
    }
}

async fn status_error(
    operation: &'static str,
    status: StatusCode,
    response: Response,
) -> InventoryError {
    InventoryError::Status {
        operation,
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    }
}

/// Record metrics for a finished call and pass the result through
fn track<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, InventoryError>,
) -> Result<T, InventoryError> {
    let outcome = if result.is_ok() { "success" } else { "error" };
    metrics::record_inventory_operation(operation, outcome, start.elapsed().as_secs_f64());
    result
}

#[async_trait]
impl InventoryProvider for InventoryREST {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ExternalEntity>, InventoryError> {
        let span = tracing::debug_span!("inventory.organization.get", organization.id = id);
        async move {
            let start = Instant::now();
            let result = match self
                .send("get", Method::GET, Some(id), None)
                .await
            {
                Ok(response) => Self::entity_or_not_found("get", response).await,
                Err(e) => Err(e),
            };
            if let Ok(None) = result {
                debug!("Organization {} not found in inventory", id);
            }
            track("get", start, result)
        }
        .instrument(span)
        .await
    }

    async fn create(
        &self,
        data: &OrganizationSpec,
    ) -> Result<Option<ExternalEntity>, InventoryError> {
        let span = info_span!(
            "inventory.organization.create",
            organization.name = data.name.as_deref().unwrap_or("")
        );
        async move {
            let start = Instant::now();
            let result = match self
                .send("create", Method::POST, None, Some(data))
                .await
            {
                Ok(response) => Self::entity_or_not_found("create", response).await,
                Err(e) => Err(e),
            };
            if let Ok(Some(entity)) = &result {
                info!("Created organization {} in inventory", entity.id);
            }
            track("create", start, result)
        }
        .instrument(span)
        .await
    }

    async fn update(&self, id: &str, data: &OrganizationSpec) -> Result<(), InventoryError> {
        let span = info_span!("inventory.organization.update", organization.id = id);
        async move {
            let start = Instant::now();
            let result = match self
                .send("update", Method::PATCH, Some(id), Some(data))
                .await
            {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => {
                    let status = response.status();
                    Err(status_error("update", status, response).await)
                }
                Err(e) => Err(e),
            };
            track("update", start, result)
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), InventoryError> {
        let span = info_span!("inventory.organization.delete", organization.id = id);
        async move {
            let start = Instant::now();
            let result = match self
                .send("delete", Method::DELETE, Some(id), None)
                .await
            {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    debug!("Organization {} already absent from inventory", id);
                    Ok(())
                }
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) => {
                    let status = response.status();
                    Err(status_error("delete", status, response).await)
                }
                Err(e) => Err(e),
            };
            track("delete", start, result)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ApiKeyAuth;

    fn client(base_url: &str) -> InventoryREST {
        InventoryREST::new(
            base_url,
            Arc::new(ApiKeyAuth::new("k")),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_organizations_url_keeps_base_path() {
        let client = client("https://inventory.example.com/v1/");
        assert_eq!(
            client.organizations_url(None).as_str(),
            "https://inventory.example.com/v1/organizations"
        );
        assert_eq!(
            client.organizations_url(Some("o-42")).as_str(),
            "https://inventory.example.com/v1/organizations/o-42"
        );
    }

    #[test]
    fn test_id_is_a_single_encoded_segment() {
        let client = client("http://inventory:8080");
        let url = client.organizations_url(Some("../admin/o-1?force=true#x"));
        assert_eq!(url.path_segments().map(Iterator::count), Some(2));
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
        assert!(url.path().starts_with("/organizations/"));
        assert!(url.path().contains("%2F"));
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let auth: Arc<dyn AuthHeaderProvider> = Arc::new(ApiKeyAuth::new("k"));
        let timeout = Duration::from_secs(1);
        assert!(InventoryREST::new("mailto:ops@example.com", auth.clone(), timeout).is_err());
        assert!(InventoryREST::new("not a url", auth, timeout).is_err());
    }

    #[tokio::test]
    async fn test_dot_segment_id_is_refused_before_sending() {
        let client = client("http://inventory.invalid");
        match client.delete("..").await {
            Err(InventoryError::InvalidId { operation, id }) => {
                assert_eq!(operation, "delete");
                assert_eq!(id, "..");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            client.fetch_by_id(".").await,
            Err(InventoryError::InvalidId { .. })
        ));
    }
}
