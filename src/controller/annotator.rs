//! # Resource Annotation
//!
//! Builds the identity write-back for an Organization resource.
//!
//! An [`Annotation`] names the spec fields and labels to set. It is applied as
//! a JSON merge patch, so every field it does not name is left alone and new
//! labels are merged into the existing map instead of replacing it.

use std::collections::BTreeMap;

use kube::ResourceExt;
use serde_json::{json, Map, Value};

use crate::controller::verification;
use crate::crd::Organization;
use crate::provider::ExternalEntity;

/// Identity fields to write back onto a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub id: String,
    pub uid: Option<String>,
    pub sha: Option<String>,
    pub name: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl Annotation {
    /// Record only the id of an organization that already exists upstream
    #[must_use]
    pub fn identity(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uid: None,
            sha: None,
            name: None,
            labels: BTreeMap::new(),
        }
    }

    /// Full write-back after the inventory API created `entity` for `resource`
    #[must_use]
    pub fn created(resource: &Organization, entity: &ExternalEntity, label_key: &str) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(label_key.to_string(), entity.id.clone());
        Self {
            id: entity.id.clone(),
            uid: resource.uid(),
            sha: Some(verification::token(&entity.id)),
            name: entity.name.clone(),
            labels,
        }
    }

    /// Apply the annotation to a copy of `resource`
    #[must_use]
    pub fn merge_into(&self, resource: &Organization) -> Organization {
        let mut merged = resource.clone();
        merged.spec.id = Some(self.id.clone());
        if let Some(uid) = &self.uid {
            merged.spec.uid = Some(uid.clone());
        }
        if let Some(sha) = &self.sha {
            merged.spec.sha = Some(sha.clone());
        }
        if let Some(name) = &self.name {
            merged.spec.name = Some(name.clone());
        }
        if !self.labels.is_empty() {
            merged
                .metadata
                .labels
                .get_or_insert_with(BTreeMap::new)
                .extend(self.labels.clone());
        }
        merged
    }

    /// JSON merge patch persisting the annotation on `resource`
    #[must_use]
    pub fn to_merge_patch(&self, resource: &Organization) -> Value {
        let merged = self.merge_into(resource);

        let mut spec = Map::new();
        spec.insert("id".to_string(), json!(self.id));
        for (key, value) in [("uid", &self.uid), ("sha", &self.sha), ("name", &self.name)] {
            if let Some(value) = value {
                spec.insert(key.to_string(), json!(value));
            }
        }

        let mut patch = Map::new();
        if !self.labels.is_empty() {
            patch.insert(
                "metadata".to_string(),
                json!({ "labels": merged.metadata.labels }),
            );
        }
        patch.insert("spec".to_string(), Value::Object(spec));
        Value::Object(patch)
    }
}
