//! Finalizer handling for AINIC resources.

use super::{ReconcileOutcome, Reconciler};
use crate::error::ControllerError;
use crds::{AINIC, AINIC_FINALIZER};
use tracing::{debug, info};

/// Whether the AINIC carries the controller's finalizer
pub fn has_finalizer(ainic: &AINIC) -> bool {
    ainic
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == AINIC_FINALIZER))
}

/// Adds the finalizer once. Returns `false` if it was already present.
pub(crate) fn insert_finalizer(ainic: &mut AINIC) -> bool {
    if has_finalizer(ainic) {
        return false;
    }
    ainic
        .metadata
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(AINIC_FINALIZER.to_string());
    true
}

/// Removes every copy of the finalizer. Returns `false` if none was present.
pub(crate) fn remove_finalizer(ainic: &mut AINIC) -> bool {
    let Some(finalizers) = ainic.metadata.finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|f| f != AINIC_FINALIZER);
    finalizers.len() != before
}

impl Reconciler {
    /// Persists the finalizer on a live AINIC.
    pub(crate) async fn add_finalizer(&self, mut ainic: AINIC) -> Result<(), ControllerError> {
        if insert_finalizer(&mut ainic) {
            self.client.update_ainic(&ainic).await?;
        }
        Ok(())
    }

    /// Releases an AINIC that is being deleted.
    ///
    /// The driver DaemonSet is not touched here; its owner reference lets the
    /// garbage collector remove it once the AINIC is gone.
    pub(crate) async fn handle_deletion(&self, mut ainic: AINIC) -> Result<ReconcileOutcome, ControllerError> {
        let name = ainic.metadata.name.clone().unwrap_or_default();

        if !remove_finalizer(&mut ainic) {
            debug!("AINIC {} is being deleted and holds no finalizer", name);
            return Ok(ReconcileOutcome::done());
        }

        self.client.update_ainic(&ainic).await?;
        info!("Removed finalizer from AINIC {}", name);
        Ok(ReconcileOutcome::done())
    }
}
