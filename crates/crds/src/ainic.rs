//! AINIC CRD
//!
//! Declares the desired AMD AI NIC driver deployment for a set of nodes and
//! carries the aggregated rollout status written back by the controller.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Finalizer placed on every live AINIC by the controller.
pub const AINIC_FINALIZER: &str = "network.amd.com/finalizer";

/// Condition type reporting whether every targeted node runs a ready driver.
pub const READY_CONDITION: &str = "Ready";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "network.amd.com",
    version = "v1",
    kind = "AINIC",
    plural = "ainics",
    namespaced,
    status = "AINICStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Nodes Ready","type":"integer","jsonPath":".status.nodesReady"}"#,
    printcolumn = r#"{"name":"Nodes Total","type":"integer","jsonPath":".status.nodesTotal"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AINICSpec {
    /// Nodes where the driver should run (label key -> value).
    /// An empty or missing selector targets every node.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// AMD AINIC driver configuration
    pub driver: DriverSpec,

    /// Network-related configuration
    #[serde(default)]
    pub network_config: NicNetworkSpec,

    /// Resource allocation for the driver
    #[serde(default)]
    pub resources: ResourcesSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriverSpec {
    /// Driver container image
    pub image: String,

    /// Driver version
    pub version: String,

    /// Additional driver arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment variables passed to the driver container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,

    /// Variable value
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NicNetworkSpec {
    /// Network mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<NetworkMode>,

    /// Number of virtual functions to create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vfs: Option<i32>,

    /// Maximum transmission unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<i32>,

    /// VLAN configuration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vlan: Vec<VlanConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum NetworkMode {
    /// Single-root I/O virtualization
    #[serde(rename = "SR-IOV")]
    SrIov,

    /// Data plane development kit
    #[serde(rename = "DPDK")]
    Dpdk,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VlanConfig {
    /// VLAN ID
    pub id: i32,

    /// VLAN priority
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hugepages_size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hugepages_count: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AINICStatus {
    /// Current rollout phase
    #[serde(default)]
    pub phase: AINICPhase,

    /// Latest observations, at most one entry per condition type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<AINICCondition>,

    /// Nodes with a ready driver
    #[serde(default)]
    pub nodes_ready: i32,

    /// Nodes targeted by the driver DaemonSet
    #[serde(default)]
    pub nodes_total: i32,

    /// Human-readable summary of the current state
    #[serde(default)]
    pub message: String,
}

impl AINICStatus {
    /// Replaces the condition with the same type in place, or appends it.
    ///
    /// The previous `lastTransitionTime` is kept when the condition status
    /// does not change. Stray duplicates of the type are dropped.
    pub fn set_condition(&mut self, mut condition: AINICCondition) {
        let condition_type = condition.r#type.clone();

        match self.conditions.iter_mut().find(|c| c.r#type == condition_type) {
            Some(existing) => {
                if existing.status == condition.status && existing.last_transition_time.is_some() {
                    condition.last_transition_time = existing.last_transition_time;
                }
                *existing = condition;
            }
            None => self.conditions.push(condition),
        }

        let mut seen = false;
        self.conditions.retain(|c| {
            if c.r#type != condition_type {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });
    }

    /// Returns the condition with the given type, if any.
    pub fn condition(&self, condition_type: &str) -> Option<&AINICCondition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }
}

/// Rollout phase of an AINIC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum AINICPhase {
    /// No node has a ready driver yet
    #[default]
    Pending,

    /// Some, but not all, targeted nodes are ready
    Progressing,

    /// Every targeted node is ready
    Ready,

    /// The driver DaemonSet could not be applied
    Failed,
}

impl std::fmt::Display for AINICPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            Self::Pending => "Pending",
            Self::Progressing => "Progressing",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        };
        f.write_str(phase)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AINICCondition {
    /// Condition type
    pub r#type: String,

    /// Condition status
    pub status: ConditionStatus,

    /// Last time the status value changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// One-word CamelCase reason for the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}
