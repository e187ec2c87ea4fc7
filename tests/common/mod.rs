//! Common test utilities
//!
//! In-memory stand-ins for the inventory API, the patch-back and the watch,
//! plus shared rustls setup for the Pact tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use organization_controller::controller::annotator::Annotation;
use organization_controller::controller::reconciler::{
    EventType, PatchError, ResourceEvent, ResourcePatcher,
};
use organization_controller::controller::server::ServerState;
use organization_controller::controller::verification;
use organization_controller::crd::{Organization, OrganizationSpec};
use organization_controller::provider::{ExternalEntity, InventoryError, InventoryProvider};
use organization_controller::runtime::{Cursor, EventSource, StreamError, WatchItem};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // We use ring as the crypto provider (matches main application)
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Organization resource as the watch would deliver it
pub fn organization(name: &str, resource_version: &str, spec: OrganizationSpec) -> Organization {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/part-of".to_string(), "cosmotech".to_string());
    Organization {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("cosmotech".to_string()),
            uid: Some(format!("uid-{name}")),
            resource_version: Some(resource_version.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec,
    }
}

/// Spec of a resource that has not been created upstream yet
pub fn fresh_spec(display_name: &str) -> OrganizationSpec {
    let mut spec = OrganizationSpec {
        name: Some(display_name.to_string()),
        ..Default::default()
    };
    spec.extra.insert(
        "security".to_string(),
        serde_json::json!({ "default": "viewer" }),
    );
    spec
}

/// Spec carrying `id` and a matching verification token
pub fn signed_spec(id: &str) -> OrganizationSpec {
    OrganizationSpec {
        id: Some(id.to_string()),
        sha: Some(verification::token(id)),
        ..fresh_spec("ACME")
    }
}

/// Spec carrying `id` with a token computed from another id
pub fn tampered_spec(id: &str, signed_for: &str) -> OrganizationSpec {
    OrganizationSpec {
        id: Some(id.to_string()),
        sha: Some(verification::token(signed_for)),
        ..fresh_spec("ACME")
    }
}

pub fn event(
    event_type: EventType,
    name: &str,
    resource_version: &str,
    spec: OrganizationSpec,
) -> ResourceEvent {
    ResourceEvent::new(event_type, organization(name, resource_version, spec))
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum InventoryCall {
    Fetch(String),
    Create(OrganizationSpec),
    Update(String, OrganizationSpec),
    Delete(String),
}

/// Inventory API kept in memory
#[derive(Default)]
pub struct FakeInventory {
    organizations: Mutex<HashMap<String, ExternalEntity>>,
    calls: Mutex<Vec<InventoryCall>>,
    failing: Mutex<HashSet<&'static str>>,
    create_not_found: Mutex<bool>,
    created: Mutex<usize>,
}

impl FakeInventory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed an organization that already exists upstream
    pub fn insert(&self, id: &str, name: &str) {
        self.organizations.lock().unwrap().insert(
            id.to_string(),
            ExternalEntity {
                id: id.to_string(),
                name: Some(name.to_string()),
                attributes: serde_json::Map::new(),
            },
        );
    }

    /// Make every call of `operation` ("get", "create", "update", "delete") fail
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn answer_create_with_not_found(&self) {
        *self.create_not_found.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<InventoryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, InventoryCall::Create(_)))
            .count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.organizations.lock().unwrap().contains_key(id)
    }

    fn check(&self, operation: &'static str) -> Result<(), InventoryError> {
        if self.failing.lock().unwrap().contains(operation) {
            return Err(InventoryError::Status {
                operation,
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryProvider for FakeInventory {
    async fn fetch_by_id(&self, id: &str) -> Result<Option<ExternalEntity>, InventoryError> {
        self.calls
            .lock()
            .unwrap()
            .push(InventoryCall::Fetch(id.to_string()));
        self.check("get")?;
        Ok(self.organizations.lock().unwrap().get(id).cloned())
    }

    async fn create(
        &self,
        data: &OrganizationSpec,
    ) -> Result<Option<ExternalEntity>, InventoryError> {
        self.calls
            .lock()
            .unwrap()
            .push(InventoryCall::Create(data.clone()));
        self.check("create")?;
        if *self.create_not_found.lock().unwrap() {
            return Ok(None);
        }

        let mut created = self.created.lock().unwrap();
        *created += 1;
        let entity = ExternalEntity {
            id: format!("o-{:04}", *created),
            name: data.name.clone(),
            attributes: serde_json::Map::new(),
        };
        self.organizations
            .lock()
            .unwrap()
            .insert(entity.id.clone(), entity.clone());
        Ok(Some(entity))
    }

    async fn update(&self, id: &str, data: &OrganizationSpec) -> Result<(), InventoryError> {
        self.calls
            .lock()
            .unwrap()
            .push(InventoryCall::Update(id.to_string(), data.clone()));
        self.check("update")
    }

    async fn delete(&self, id: &str) -> Result<(), InventoryError> {
        self.calls
            .lock()
            .unwrap()
            .push(InventoryCall::Delete(id.to_string()));
        self.check("delete")?;
        self.organizations.lock().unwrap().remove(id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Patch-back
// ---------------------------------------------------------------------------

/// Records annotations instead of patching the API server
#[derive(Default)]
pub struct RecordingPatcher {
    patches: Mutex<Vec<(String, Annotation)>>,
    failing: Mutex<bool>,
}

impl RecordingPatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    /// (resource name, annotation) pairs in call order
    pub fn patches(&self) -> Vec<(String, Annotation)> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourcePatcher for RecordingPatcher {
    async fn patch(
        &self,
        resource: &Organization,
        annotation: &Annotation,
    ) -> Result<(), PatchError> {
        if *self.failing.lock().unwrap() {
            return Err(PatchError::MissingName);
        }
        let name = resource.metadata.name.clone().ok_or(PatchError::MissingName)?;
        self.patches
            .lock()
            .unwrap()
            .push((name, annotation.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// What one call to `open` produces
pub enum Opening {
    Stream(Vec<Result<WatchItem, StreamError>>),
    Fail(StreamError),
}

/// Replays scripted streams in order and records the cursor of every open
///
/// Once the script is exhausted it clears the server readiness, which stops
/// the watch loop.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Opening>>,
    opened_at: Mutex<Vec<String>>,
    server_state: Arc<ServerState>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Opening>, server_state: Arc<ServerState>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            opened_at: Mutex::new(Vec::new()),
            server_state,
        }
    }

    /// Cursor passed to each `open`, in order
    pub fn opened_at(&self) -> Vec<String> {
        self.opened_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn open(
        &self,
        cursor: &Cursor,
    ) -> Result<BoxStream<'static, Result<WatchItem, StreamError>>, StreamError> {
        self.opened_at
            .lock()
            .unwrap()
            .push(cursor.as_str().to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Opening::Stream(items)) => Ok(stream::iter(items).boxed()),
            Some(Opening::Fail(e)) => Err(e),
            None => {
                self.server_state.set_ready(false);
                Ok(stream::empty().boxed())
            }
        }
    }
}

pub fn ready_server_state() -> Arc<ServerState> {
    let state = Arc::new(ServerState::default());
    state.set_ready(true);
    state
}
