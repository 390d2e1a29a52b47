//! NetworkConfig CRD
//!
//! Cluster-wide configuration for the per-node helper agents (config manager
//! and node labeller) that run alongside the AINIC driver.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "network.amd.com",
    version = "v1alpha1",
    kind = "NetworkConfig",
    plural = "networkconfigs",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfigSpec {
    /// Node selector shared by every agent DaemonSet
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,

    /// Driver settings relevant to the agents
    #[serde(default)]
    pub driver: AgentDriverSpec,

    /// Settings shared by all agents
    #[serde(default)]
    pub common_config: CommonConfigSpec,

    /// Config manager agent
    #[serde(default)]
    pub config_manager: ConfigManagerSpec,

    /// Device plugin and node labeller agents
    #[serde(default)]
    pub device_plugin: DevicePluginSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentDriverSpec {
    /// Blacklist the in-tree ionic module on the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommonConfigSpec {
    /// Image for agent init containers (falls back to a busybox default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_container_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigManagerSpec {
    /// Deploy the config manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Name of the pull secret for the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_registry_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_manager_tolerations: Vec<AgentToleration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<UpgradePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DevicePluginSpec {
    /// Deploy the node labeller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_node_labeller: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_labeller_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_labeller_image_pull_policy: Option<String>,

    /// Name of the pull secret for the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_registry_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_labeller_tolerations: Vec<AgentToleration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<UpgradePolicy>,
}

/// Toleration applied to an agent pod
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentToleration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// `Exists` or `Equal`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// `NoSchedule`, `PreferNoSchedule` or `NoExecute`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toleration_seconds: Option<i64>,
}

/// DaemonSet rollout policy for an agent
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePolicy {
    /// `RollingUpdate` or `OnDelete`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_strategy: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults_when_sections_missing() {
        let spec: NetworkConfigSpec = serde_yaml::from_str("selector:\n  amd.com/nic: \"true\"\n").unwrap();

        assert_eq!(spec.selector.get("amd.com/nic").map(String::as_str), Some("true"));
        assert_eq!(spec.driver.blacklist, None);
        assert_eq!(spec.config_manager, ConfigManagerSpec::default());
        assert!(spec.device_plugin.node_labeller_tolerations.is_empty());
    }

    #[test]
    fn test_agent_sections_deserialize() {
        let manifest = r#"
driver:
  blacklist: true
commonConfig:
  initContainerImage: busybox:1.37
configManager:
  enable: true
  image: registry.local/dcm:v1
  configManagerTolerations:
    - key: amd.com/nic
      operator: Exists
      effect: NoSchedule
  upgradePolicy:
    upgradeStrategy: RollingUpdate
    maxUnavailable: 1
devicePlugin:
  enableNodeLabeller: true
  nodeLabellerImage: registry.local/labeller:v2
"#;
        let spec: NetworkConfigSpec = serde_yaml::from_str(manifest).unwrap();

        assert_eq!(spec.driver.blacklist, Some(true));
        assert_eq!(spec.common_config.init_container_image.as_deref(), Some("busybox:1.37"));
        assert_eq!(spec.config_manager.config_manager_tolerations[0].operator.as_deref(), Some("Exists"));
        assert_eq!(
            spec.config_manager.upgrade_policy.as_ref().and_then(|p| p.max_unavailable),
            Some(1)
        );
        assert_eq!(spec.device_plugin.enable_node_labeller, Some(true));
    }
}
