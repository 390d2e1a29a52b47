//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the cluster
//! client, reconciler, watcher and probe server together and supervises
//! their background tasks.

use crate::backoff::ExponentialBackoff;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::server::{self, ProbeState};
use crate::watcher::{self, Context};
use cluster_client::KubeClusterClient;
use kube::Client;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for AINIC resource management.
#[derive(Debug)]
pub struct Controller {
    ainic_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing AINIC Controller");

        let kube_client = Client::try_default().await?;
        let cluster_client = Arc::new(KubeClusterClient::new(kube_client.clone()));

        let metrics = Metrics::new().map_err(|e| ControllerError::Server(format!("metrics registry: {}", e)))?;
        let probe_state = Arc::new(ProbeState::new(metrics.clone()));

        let reconciler = Reconciler::new(cluster_client, config.workload_settings(), config.requeue_interval);
        let ctx = Arc::new(Context::new(reconciler, metrics, ExponentialBackoff::default()));

        let probe_server = {
            let state = probe_state.clone();
            let addr = config.probe_addr;
            tokio::spawn(async move { server::serve(addr, state).await })
        };

        let ainic_watcher = {
            let namespace = config.namespace.clone();
            let concurrency = config.max_concurrent_reconciles;
            tokio::spawn(async move { watcher::watch_ainics(kube_client, namespace, ctx, concurrency).await })
        };

        probe_state.set_ready(true);

        Ok(Self {
            ainic_watcher,
            probe_server,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("AINIC Controller running");

        // The watcher returns on SIGTERM/SIGINT; the probe server should never return.
        tokio::select! {
            result = &mut self.ainic_watcher => {
                self.probe_server.abort();
                result.map_err(|e| ControllerError::Watch(format!("AINIC watcher panicked: {}", e)))??;
            }
            result = &mut self.probe_server => {
                self.ainic_watcher.abort();
                result.map_err(|e| ControllerError::Server(format!("probe server panicked: {}", e)))??;
                return Err(ControllerError::Server("probe server exited".to_string()));
            }
        }

        info!("AINIC Controller stopped");
        Ok(())
    }
}
