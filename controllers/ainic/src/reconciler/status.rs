//! Status aggregation for AINIC resources.
//!
//! The driver DaemonSet reports how many nodes should run the driver
//! (`desiredNumberScheduled`) and how many run a ready pod (`numberReady`).
//! Those two counters are folded into a phase, a summary message and the
//! `Ready` condition.

use super::Reconciler;
use crate::error::ControllerError;
use chrono::{SubsecRound, Utc};
use crds::{AINIC, AINICCondition, AINICPhase, AINICStatus, ConditionStatus, READY_CONDITION};
use k8s_openapi::api::apps::v1::DaemonSet;
use tracing::{debug, info, warn};

pub const ALL_NODES_READY_MESSAGE: &str = "All nodes are ready with AINIC driver";
pub const WAITING_MESSAGE: &str = "Waiting for AINIC driver to be scheduled";
pub const READY_CONDITION_MESSAGE: &str = "All nodes have AINIC driver ready";

/// Phase and summary message for the given counters. Negative input is treated as zero.
pub fn aggregate(desired: i32, ready: i32) -> (AINICPhase, String) {
    let desired = desired.max(0);
    let ready = ready.max(0);

    if desired == 0 || ready == 0 {
        (AINICPhase::Pending, WAITING_MESSAGE.to_string())
    } else if ready == desired {
        (AINICPhase::Ready, ALL_NODES_READY_MESSAGE.to_string())
    } else {
        (AINICPhase::Progressing, progress_message(ready, desired))
    }
}

/// The `Ready` condition matching a phase
pub fn ready_condition(phase: AINICPhase, ready: i32, total: i32) -> AINICCondition {
    let (status, reason, message) = if phase == AINICPhase::Ready {
        (ConditionStatus::True, "AllNodesReady", READY_CONDITION_MESSAGE.to_string())
    } else {
        (ConditionStatus::False, "NotAllNodesReady", progress_message(ready, total))
    };

    AINICCondition {
        r#type: READY_CONDITION.to_string(),
        status,
        last_transition_time: Some(Utc::now().trunc_subsecs(0)),
        reason: Some(reason.to_string()),
        message: Some(message),
    }
}

/// Status derived from the applied DaemonSet, starting from the previous status
/// so that unrelated conditions and transition times are preserved.
pub fn observe(previous: Option<&AINICStatus>, daemon_set: &DaemonSet) -> AINICStatus {
    let (desired, ready) = daemon_set
        .status
        .as_ref()
        .map_or((0, 0), |s| (s.desired_number_scheduled.max(0), s.number_ready.max(0)));
    let (phase, message) = aggregate(desired, ready);

    let mut status = previous.cloned().unwrap_or_default();
    status.phase = phase;
    status.message = message;
    status.nodes_total = desired;
    status.nodes_ready = ready;
    status.set_condition(ready_condition(phase, ready, desired));
    status
}

/// Status recording a failed apply. Counters and conditions keep their last values.
pub fn failed(previous: Option<&AINICStatus>, error: &ControllerError) -> AINICStatus {
    let mut status = previous.cloned().unwrap_or_default();
    status.phase = AINICPhase::Failed;
    status.message = format!("Failed to reconcile DaemonSet: {}", error);
    status
}

fn progress_message(ready: i32, total: i32) -> String {
    format!("AINIC driver ready on {}/{} nodes", ready, total)
}

impl Reconciler {
    /// Writes `status` unless the AINIC already carries exactly that status.
    pub(crate) async fn write_status(&self, ainic: &AINIC, status: AINICStatus) -> Result<(), ControllerError> {
        let name = ainic.metadata.name.as_deref().unwrap_or_default();
        if ainic.status.as_ref() == Some(&status) {
            debug!("AINIC {} status unchanged", name);
            return Ok(());
        }

        let phase = status.phase;
        let mut updated = ainic.clone();
        updated.status = Some(status);
        self.client.update_ainic_status(&updated).await?;
        info!("AINIC {} is {}", name, phase);
        Ok(())
    }

    /// Best-effort `Failed` status after an apply error. Write errors are logged only.
    pub(crate) async fn record_failure(&self, ainic: &AINIC, error: &ControllerError) {
        let status = failed(ainic.status.as_ref(), error);
        if let Err(write_error) = self.write_status(ainic, status).await {
            warn!(
                "Failed to record failure on AINIC {}: {}",
                ainic.metadata.name.as_deref().unwrap_or_default(),
                write_error
            );
        }
    }
}
