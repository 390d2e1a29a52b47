//! Driver DaemonSet apply step.

use super::Reconciler;
use crate::error::ControllerError;
use crate::workload::{build_daemon_set, merge_into, needs_update};
use cluster_client::{Lookup, ObjectKey};
use crds::AINIC;
use k8s_openapi::api::apps::v1::DaemonSet;
use tracing::{debug, info};

impl Reconciler {
    /// Creates the driver DaemonSet, or updates it when the controller-owned
    /// fields have drifted. Returns the stored object.
    pub(crate) async fn apply_daemon_set(&self, ainic: &AINIC) -> Result<DaemonSet, ControllerError> {
        let desired = build_daemon_set(ainic, &self.settings)?;
        let key = ObjectKey::from_resource(&desired)?;

        match self.client.get_daemon_set(&key).await? {
            Lookup::Absent => {
                info!("Creating DaemonSet {}", key);
                Ok(self.client.create_daemon_set(&desired).await?)
            }
            Lookup::Found(existing) => {
                if !needs_update(&existing, &desired)? {
                    debug!("DaemonSet {} is up to date", key);
                    return Ok(existing);
                }
                info!("Updating DaemonSet {}", key);
                let updated = merge_into(existing, desired);
                Ok(self.client.update_daemon_set(&updated).await?)
            }
        }
    }
}
