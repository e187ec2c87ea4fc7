//! # Organization Spec
//!
//! The `Organization` custom resource.
//!
//! Only four spec fields mean anything to the controller: `id`, `uid`, `sha`
//! and `name`. They are written back by the controller once the organization
//! exists in the inventory API. Every other declared field is carried through
//! untouched and forwarded verbatim as the API payload.

use std::borrow::Cow;
use std::collections::BTreeMap;

use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// Organization Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: api.cosmotech.com/v1
/// kind: Organization
/// metadata:
///   name: acme
///   namespace: cosmotech
/// spec:
///   name: ACME Corporation
///   security:
///     default: viewer
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[kube(
    kind = "Organization",
    group = "api.cosmotech.com",
    version = "v1",
    plural = "organizations",
    namespaced,
    derive = "PartialEq",
    shortname = "org",
    printcolumn = r#"{"name":"Id", "type":"string", "jsonPath":".spec.id"}, {"name":"Display Name", "type":"string", "jsonPath":".spec.name"}"#
)]
pub struct OrganizationSpec {
    /// Identifier assigned by the inventory API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Kubernetes uid of the resource that created the organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Verification token derived from `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    /// Display name as returned by the inventory API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared fields forwarded to the inventory API unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl OrganizationSpec {
    /// The organization id, ignoring an empty string
    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

// The spec is an open document: the API server must not prune the declared
// pass-through fields, so the schema lists the identity fields and preserves
// everything else.
impl JsonSchema for OrganizationSpec {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("OrganizationSpec")
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "object",
            "description": "Organization declaration. Fields other than id, uid, sha and name are forwarded to the inventory API as-is.",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "Identifier assigned by the inventory API (written by the controller)"
                },
                "uid": {
                    "type": "string",
                    "description": "Uid of the resource that created the organization (written by the controller)"
                },
                "sha": {
                    "type": "string",
                    "description": "Verification token derived from id (written by the controller)"
                },
                "name": {
                    "type": "string",
                    "description": "Display name of the organization"
                }
            },
            "x-kubernetes-preserve-unknown-fields": true
        })
    }
}
