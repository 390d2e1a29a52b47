//! Reconciliation logic for AINIC resources.
//!
//! One pass brings the cluster one step closer to the declared state:
//! - `deletion`: finalizer lifecycle
//! - `daemon_set`: create-or-update of the driver DaemonSet
//! - `status`: phase and condition aggregation from DaemonSet counters

pub mod daemon_set;
pub mod deletion;
pub mod status;

#[cfg(test)]
mod status_test;

use crate::error::ControllerError;
use crate::workload::WorkloadSettings;
use cluster_client::{ClusterClientTrait, Lookup, ObjectKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default delay before a healthy AINIC is checked again
pub const DEFAULT_REQUEUE_INTERVAL: Duration = Duration::from_secs(300);

/// What the dispatcher should do after a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// `None` waits for the next watch event
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    pub const fn done() -> Self {
        Self { requeue_after: None }
    }

    pub const fn requeue(after: Duration) -> Self {
        Self {
            requeue_after: Some(after),
        }
    }
}

/// Reconciles AINIC resources against their driver DaemonSets.
///
/// Holds no per-object state; every pass starts from a fresh read.
pub struct Reconciler {
    pub(crate) client: Arc<dyn ClusterClientTrait>,
    pub(crate) settings: WorkloadSettings,
    pub(crate) requeue_interval: Duration,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.settings)
            .field("requeue_interval", &self.requeue_interval)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(client: Arc<dyn ClusterClientTrait>, settings: WorkloadSettings, requeue_interval: Duration) -> Self {
        Self {
            client,
            settings,
            requeue_interval,
        }
    }

    /// Runs one reconcile pass for the AINIC identified by `key`.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ControllerError> {
        let ainic = match self.client.get_ainic(key).await? {
            Lookup::Found(ainic) => ainic,
            Lookup::Absent => {
                debug!("AINIC {} not found, nothing to do", key);
                return Ok(ReconcileOutcome::done());
            }
        };

        if ainic.metadata.deletion_timestamp.is_some() {
            return self.handle_deletion(ainic).await;
        }

        if !deletion::has_finalizer(&ainic) {
            info!("Adding finalizer to AINIC {}", key);
            self.add_finalizer(ainic).await?;
            return Ok(ReconcileOutcome::done());
        }

        let daemon_set = match self.apply_daemon_set(&ainic).await {
            Ok(daemon_set) => daemon_set,
            Err(e) => {
                self.record_failure(&ainic, &e).await;
                return Err(e);
            }
        };

        let observed = status::observe(ainic.status.as_ref(), &daemon_set);
        self.write_status(&ainic, observed).await?;

        Ok(ReconcileOutcome::requeue(self.requeue_interval))
    }
}
