//! Kubernetes resource watcher.
//!
//! This module drives the reconciler from a `kube_runtime::Controller`.
//! The controller queue guarantees at most one pass per object at a time,
//! retries reconnect the watch automatically, and owned DaemonSet events
//! are mapped back to their AINIC.

use crate::backoff::ExponentialBackoff;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use cluster_client::ObjectKey;
use crds::AINIC;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::{Api, Client};
use kube_runtime::controller::{Action, Config as RuntimeConfig};
use kube_runtime::{Controller, watcher};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile and error-policy call
pub struct Context {
    reconciler: Reconciler,
    metrics: Metrics,
    backoff: ExponentialBackoff,
    /// Consecutive failures per object (namespace/name)
    error_counts: Mutex<HashMap<String, u32>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("reconciler", &self.reconciler)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(reconciler: Reconciler, metrics: Metrics, backoff: ExponentialBackoff) -> Self {
        Self {
            reconciler,
            metrics,
            backoff,
            error_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Records one more failure for `id` and returns the new count.
    fn record_error(&self, id: &str) -> u32 {
        let mut counts = self.error_counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let count = counts.entry(id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    fn reset_errors(&self, id: &str) {
        self.error_counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
    }
}

fn object_id(ainic: &AINIC) -> String {
    ObjectKey::from_resource(ainic)
        .map(|key| key.to_string())
        .unwrap_or_else(|_| "<unnamed>".to_string())
}

async fn reconcile(ainic: Arc<AINIC>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ObjectKey::from_resource(ainic.as_ref())?;
    debug!("Reconciling AINIC {}", key);

    let started = Instant::now();
    let result = ctx.reconciler.reconcile(&key).await;
    ctx.metrics.observe(started, result.is_ok());

    let outcome = result?;
    ctx.reset_errors(&key.to_string());
    Ok(match outcome.requeue_after {
        Some(delay) => Action::requeue(delay),
        None => Action::await_change(),
    })
}

fn error_policy(ainic: Arc<AINIC>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let id = object_id(&ainic);
    let attempts = ctx.record_error(&id);
    let delay = ctx.backoff.delay_for(attempts);
    error!(
        "Reconciliation failed for AINIC {} (attempt {}), retrying in {:?}: {}",
        id, attempts, delay, error
    );
    Action::requeue(delay)
}

/// Watches AINIC resources and their driver DaemonSets until shutdown.
pub async fn watch_ainics(
    client: Client,
    namespace: Option<String>,
    ctx: Arc<Context>,
    concurrency: u16,
) -> Result<(), ControllerError> {
    let (ainics, daemon_sets): (Api<AINIC>, Api<DaemonSet>) = match namespace.as_deref() {
        Some(ns) => (Api::namespaced(client.clone(), ns), Api::namespaced(client, ns)),
        None => (Api::all(client.clone()), Api::all(client)),
    };

    info!("Starting AINIC watcher (concurrency {})", concurrency);

    Controller::new(ainics, watcher::Config::default())
        .owns(daemon_sets, watcher::Config::default())
        .with_config(RuntimeConfig::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((object, _)) => debug!("Reconciled AINIC {}", object.name),
                Err(e) => warn!("AINIC controller error: {}", e),
            }
        })
        .await;

    info!("AINIC watcher stopped");
    Ok(())
}
