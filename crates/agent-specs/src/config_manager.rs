//! Config manager agent

use crate::{
    AgentOptions, AgentSpec, DEFAULT_INIT_CONTAINER_IMAGE, InitContainerSpec, MainContainerSpec,
    WAIT_FOR_DRIVER_SCRIPT, field_env, host_path, mount, tolerations, value_env,
};
use crds::NetworkConfig;

pub const DEFAULT_CONFIG_MANAGER_IMAGE: &str = "docker.io/rocm/device-config-manager:latest";
pub const CONFIG_MANAGER_SERVICE_ACCOUNT: &str = "amd-network-operator-config-manager";

/// Builds the config manager fragments for a `NetworkConfig`.
///
/// Outside simulation the init container waits for the ionic driver and the
/// main container additionally gets `nicctl`, `/opt/amd` and the AINIC
/// metadata directory from the host.
pub fn build_config_manager_spec(config: &NetworkConfig, options: &AgentOptions) -> AgentSpec {
    let spec = &config.spec.config_manager;

    let command = if options.sim_enabled {
        Vec::new()
    } else {
        vec!["sh".to_string(), "-c".to_string(), WAIT_FOR_DRIVER_SCRIPT.to_string()]
    };

    let init_container = InitContainerSpec {
        name: "driver-init".to_string(),
        image: config.spec.common_config.init_container_image.clone(),
        default_image: DEFAULT_INIT_CONTAINER_IMAGE.to_string(),
        command,
        privileged: true,
        env: vec![value_env("SIM_ENABLE", if options.sim_enabled { "true" } else { "false" })],
        volume_mounts: vec![mount("sys-volume", "/host-sys")],
    };

    let mut volume_mounts = vec![
        mount("dev-volume", "/dev"),
        mount("sys-volume", "/sys"),
        mount("lib-modules", "/lib/modules"),
    ];
    let mut volumes = vec![
        host_path("dev-volume", "/dev", "Directory"),
        host_path("sys-volume", "/sys", "Directory"),
        host_path("lib-modules", "/lib/modules", "Directory"),
    ];
    if !options.sim_enabled {
        volume_mounts.extend([
            mount("nicctl", "/usr/sbin/nicctl"),
            mount("opt-amd", "/opt/amd"),
            mount("metadata", "/etc/amd/ainic"),
        ]);
        volumes.extend([
            host_path("nicctl", "/usr/sbin/nicctl", "File"),
            host_path("opt-amd", "/opt/amd", "Directory"),
            host_path("metadata", "/etc/amd/ainic", "Directory"),
        ]);
    }

    let main_container = MainContainerSpec {
        name: "config-manager".to_string(),
        image: spec.image.clone(),
        default_image: DEFAULT_CONFIG_MANAGER_IMAGE.to_string(),
        image_pull_policy: spec.image_pull_policy.clone(),
        image_registry_secret: spec.image_registry_secret.clone(),
        privileged: true,
        env: vec![
            field_env("DS_NODE_NAME", "spec.nodeName"),
            field_env("POD_NAMESPACE", "metadata.namespace"),
            field_env("POD_NAME", "metadata.name"),
        ],
        volume_mounts,
    };

    AgentSpec {
        name: config.metadata.name.clone().unwrap_or_default(),
        namespace: config.metadata.namespace.clone().unwrap_or_default(),
        enable: spec.enable.unwrap_or(false),
        service_account_name: CONFIG_MANAGER_SERVICE_ACCOUNT.to_string(),
        tolerations: tolerations(&spec.config_manager_tolerations),
        upgrade_policy: spec.upgrade_policy.clone(),
        selector: config.spec.selector.clone(),
        init_containers: vec![init_container],
        main_container,
        volumes,
    }
}
