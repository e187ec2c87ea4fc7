//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes and inventory client setup.

use std::sync::Arc;

use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::{error, info, warn};

use super::event_stream::KubeEventSource;
use super::watch_loop::WatchSettings;
use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::{KubePatcher, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::crd::Organization;
use crate::observability;
use crate::provider::{auth, InventoryREST};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Source of Organization events in the watched namespace
    pub event_source: KubeEventSource,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Watch loop pacing
    pub watch_settings: WatchSettings,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("namespace", &self.controller_config.namespace)
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Configuration loading (fails fast on missing variables)
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Inventory client and reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    // Configure rustls crypto provider FIRST, before any other operations
    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "organization_controller=info".into()),
        )
        .init();

    info!("Starting Organization Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let controller_config =
        ControllerConfig::from_env().context("Invalid controller configuration")?;
    let server_config = ServerConfig::from_env();
    info!(
        namespace = controller_config.namespace.as_str(),
        api_url = controller_config.api_url.as_str(),
        auth_mode = controller_config.auth.mode(),
        "Configuration loaded"
    );

    // Initialize metrics
    observability::metrics::register_metrics()?;

    // Create server state
    let server_state = Arc::new(ServerState::default());

    // Start HTTP server for metrics and probes
    // We start it in a background task but wait for it to be ready before proceeding
    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {:#}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let organizations: Api<Organization> =
        Api::namespaced(client.clone(), &controller_config.namespace);
    check_crd_queryable(&organizations, &controller_config.namespace).await;

    let auth = auth::from_config(&controller_config.auth)?;
    let inventory = Arc::new(InventoryREST::new(
        &controller_config.api_url,
        auth,
        controller_config.http_timeout(),
    )?);
    let patcher = Arc::new(KubePatcher::new(
        client.clone(),
        controller_config.namespace.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(
        inventory,
        patcher,
        controller_config.challenge_label_key.clone(),
    ));

    let event_source = KubeEventSource::new(organizations, controller_config.watch_timeout_secs);
    let watch_settings = WatchSettings::from(&controller_config);

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        event_source,
        reconciler,
        watch_settings,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        // Set by start_server once bound
        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log whether Organization resources can be listed before the watch starts
///
/// A failure is not fatal here: the watch loop classifies and retries it.
async fn check_crd_queryable(organizations: &Api<Organization>, namespace: &str) {
    match organizations.list(&ListParams::default().limit(1)).await {
        Ok(_) => {
            info!(
                "CRD is queryable, watching Organization resources in namespace {}",
                namespace
            );
        }
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!(error = %e, "CRD queryability check failed");
        }
    }
}
