//! # Patch-back
//!
//! Persists an [`Annotation`] on the Organization resource through the API
//! server as a JSON merge patch.

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use super::types::PatchError;
use crate::constants::FIELD_MANAGER;
use crate::controller::annotator::Annotation;
use crate::crd::Organization;

/// Writes annotations back onto resources
#[async_trait]
pub trait ResourcePatcher: Send + Sync {
    async fn patch(&self, resource: &Organization, annotation: &Annotation)
        -> Result<(), PatchError>;
}

/// [`ResourcePatcher`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubePatcher {
    client: Client,
    default_namespace: String,
}

impl std::fmt::Debug for KubePatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePatcher")
            .field("default_namespace", &self.default_namespace)
            .finish_non_exhaustive()
    }
}

impl KubePatcher {
    #[must_use]
    pub fn new(client: Client, default_namespace: impl Into<String>) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
        }
    }
}

#[async_trait]
impl ResourcePatcher for KubePatcher {
    async fn patch(
        &self,
        resource: &Organization,
        annotation: &Annotation,
    ) -> Result<(), PatchError> {
        let name = resource.metadata.name.clone().ok_or(PatchError::MissingName)?;
        let namespace = resource
            .namespace()
            .unwrap_or_else(|| self.default_namespace.clone());

        let api: Api<Organization> = Api::namespaced(self.client.clone(), &namespace);
        let patch = annotation.to_merge_patch(resource);
        let patch_params = PatchParams::apply(FIELD_MANAGER);

        api.patch(&name, &patch_params, &Patch::Merge(patch))
            .await
            .map_err(|source| PatchError::Kube {
                namespace: namespace.clone(),
                name: name.clone(),
                source,
            })?;

        debug!(
            "Patched Organization {}/{} with id {}",
            namespace, name, annotation.id
        );
        Ok(())
    }
}
