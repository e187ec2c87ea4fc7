//! # CRD Validation Tests
//!
//! Checks the generated CustomResourceDefinition and the deserialization of
//! sample `Organization` manifests to catch schema drift early.

use kube::core::CustomResourceExt;
use organization_controller::crd::Organization;
use serde_json::json;

#[test]
fn test_crd_identity() {
    let crd = Organization::crd();

    assert_eq!(crd.spec.group, "api.cosmotech.com");
    assert_eq!(crd.spec.names.kind, "Organization");
    assert_eq!(crd.spec.names.plural, "organizations");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(crd.spec.versions.len(), 1);
    assert_eq!(crd.spec.versions[0].name, "v1");
}

#[test]
fn test_crd_schema_preserves_unknown_spec_fields() {
    let crd = Organization::crd();
    let schema = serde_json::to_value(&crd.spec.versions[0].schema)
        .expect("Should serialize CRD schema");
    let spec = &schema["openAPIV3Schema"]["properties"]["spec"];

    assert_eq!(spec["x-kubernetes-preserve-unknown-fields"], json!(true));
    for field in ["id", "uid", "sha", "name"] {
        assert_eq!(
            spec["properties"][field]["type"],
            json!("string"),
            "{field} should be a string property"
        );
    }
}

#[test]
fn test_fresh_organization_manifest() {
    let yaml = r"
apiVersion: api.cosmotech.com/v1
kind: Organization
metadata:
  name: acme
  namespace: cosmotech
spec:
  name: ACME Corporation
  security:
    default: viewer
    accessControlList:
      - id: alice@example.com
        role: admin
";

    let org: Organization =
        serde_yaml::from_str(yaml).expect("Should deserialize a fresh Organization");

    assert_eq!(org.metadata.name.as_deref(), Some("acme"));
    assert_eq!(org.spec.name.as_deref(), Some("ACME Corporation"));
    assert!(org.spec.organization_id().is_none());
    assert!(org.spec.sha.is_none());
    assert_eq!(
        org.spec.extra["security"]["accessControlList"][0]["role"],
        json!("admin")
    );
}

#[test]
fn test_annotated_organization_manifest() {
    let yaml = r"
apiVersion: api.cosmotech.com/v1
kind: Organization
metadata:
  name: acme
  namespace: cosmotech
  labels:
    challenge: o-abcdef123
spec:
  id: o-abcdef123
  uid: 0b8c3a6e-5d4f-4d1a-9c2e-7f0a1b2c3d4e
  sha: 5c7f4dc1c1ab1ff1aa0e3a3a5b0a8a1cd50f4d4b
  name: ACME Corporation
";

    let org: Organization =
        serde_yaml::from_str(yaml).expect("Should deserialize an annotated Organization");

    assert_eq!(org.spec.organization_id(), Some("o-abcdef123"));
    assert_eq!(
        org.spec.uid.as_deref(),
        Some("0b8c3a6e-5d4f-4d1a-9c2e-7f0a1b2c3d4e")
    );
    assert!(org.spec.extra.is_empty());
}
