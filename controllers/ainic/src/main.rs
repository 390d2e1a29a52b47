//! AINIC Controller
//!
//! Rolls out the AMD AI NIC driver as a DaemonSet for every `AINIC` resource
//! and reports per-node readiness back on the resource:
//! - creates and updates `<name>-ainic-driver` DaemonSets
//! - aggregates DaemonSet counters into phase, message and `Ready` condition
//! - holds a finalizer so deletion is observed before the object disappears

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod server;
mod watcher;
mod workload;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube's rustls client needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting AINIC Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Requeue interval: {:?}", config.requeue_interval);
    info!("  Max concurrent reconciles: {}", config.max_concurrent_reconciles);
    info!("  Driver service account: {}", config.driver_service_account);
    info!("  Probe address: {}", config.probe_addr);
    info!(
        "  Simulation: {}, OpenShift: {}",
        config.agent_options.sim_enabled, config.agent_options.is_openshift
    );

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
