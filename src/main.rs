//! # Organization Controller
//!
//! A Kubernetes controller that keeps an external organization inventory API in
//! sync with `Organization` custom resources (`api.cosmotech.com/v1`).
//!
//! ## Overview
//!
//! 1. **Watching Organizations** - A single namespaced watch, resumed from the last seen resource version
//! 2. **Creating organizations** - `ADDED` resources without a known organization are created upstream
//! 3. **Writing identity back** - The assigned id, resource uid, verification token, name and a label are patched onto the resource
//! 4. **Guarded updates and deletes** - `MODIFIED` and `DELETED` events only reach the API when the stored token matches `spec.id`
//!
//! Events are processed strictly one at a time, in arrival order.
//!
//! ## Features
//!
//! - **Static key or bearer token** authentication against the inventory API
//! - **Prometheus metrics** on `/metrics`
//! - **Health probes** on `/healthz` and `/readyz`

use anyhow::{Context, Result};
use organization_controller::runtime::{initialize, run_watch_loop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    let server_state = init.server_state.clone();

    tokio::select! {
        result = run_watch_loop(
            &init.event_source,
            &init.reconciler,
            &init.watch_settings,
            init.server_state.clone(),
        ) => {
            result.context("Watch loop stopped")?;
        }
        () = shutdown_signal() => {
            info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
            server_state.set_ready(false);
        }
    }

    info!("Organization controller exited");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
