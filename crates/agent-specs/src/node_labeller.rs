//! Node labeller agent

use crate::{
    AgentOptions, AgentSpec, DEFAULT_INIT_CONTAINER_IMAGE, InitContainerSpec, MainContainerSpec,
    WAIT_FOR_DRIVER_SCRIPT, field_env, host_path, mount, tolerations, value_env,
};
use crds::NetworkConfig;

pub const DEFAULT_NODE_LABELLER_IMAGE: &str = "docker.io/rocm/k8s-network-node-labeller:v1.1.0";
pub const NODE_LABELLER_SERVICE_ACCOUNT: &str = "amd-network-operator-node-labeller";
pub const NODE_LABELLER_NAME_SUFFIX: &str = "node-labeller";
pub const BLACKLIST_FILE: &str = "/host-etc/modprobe.d/blacklist-ionic-netop.conf";

/// Builds the node labeller fragments for a `NetworkConfig`.
pub fn build_node_labeller_spec(config: &NetworkConfig, options: &AgentOptions) -> AgentSpec {
    let spec = &config.spec.device_plugin;
    let blacklist = config.spec.driver.blacklist.unwrap_or(false);

    let init_container = InitContainerSpec {
        name: "driver-init".to_string(),
        image: config.spec.common_config.init_container_image.clone(),
        default_image: DEFAULT_INIT_CONTAINER_IMAGE.to_string(),
        command: init_command(options, blacklist),
        privileged: true,
        env: Vec::new(),
        volume_mounts: vec![mount("sys-volume", "/sys"), mount("etc-volume", "/host-etc")],
    };

    let mut env = vec![field_env("DS_NODE_NAME", "spec.nodeName")];
    if options.sim_enabled {
        env.push(value_env("SIM_ENABLE", "1"));
    }

    let main_container = MainContainerSpec {
        name: NODE_LABELLER_NAME_SUFFIX.to_string(),
        image: spec.node_labeller_image.clone(),
        default_image: DEFAULT_NODE_LABELLER_IMAGE.to_string(),
        image_pull_policy: spec.node_labeller_image_pull_policy.clone(),
        image_registry_secret: spec.image_registry_secret.clone(),
        privileged: true,
        env,
        volume_mounts: vec![
            mount("dev-volume", "/dev"),
            mount("sys-volume", "/sys"),
            mount("lib-modules", "/lib/modules"),
        ],
    };

    AgentSpec {
        name: config.metadata.name.clone().unwrap_or_default(),
        namespace: config.metadata.namespace.clone().unwrap_or_default(),
        enable: spec.enable_node_labeller.unwrap_or(false),
        service_account_name: NODE_LABELLER_SERVICE_ACCOUNT.to_string(),
        tolerations: tolerations(&spec.node_labeller_tolerations),
        upgrade_policy: spec.upgrade_policy.clone(),
        selector: config.spec.selector.clone(),
        init_containers: vec![init_container],
        main_container,
        volumes: vec![
            host_path("dev-volume", "/dev", "Directory"),
            host_path("sys-volume", "/sys", "Directory"),
            host_path("lib-modules", "/lib/modules", "Directory"),
            host_path("etc-volume", "/etc", "Directory"),
        ],
    }
}

/// Init container command.
///
/// Simulation only maintains the blacklist file, OpenShift only waits for
/// the driver, everything else updates the blacklist and then waits.
fn init_command(options: &AgentOptions, blacklist: bool) -> Vec<String> {
    let script = if options.sim_enabled {
        blacklist_action(blacklist)
    } else if options.is_openshift {
        WAIT_FOR_DRIVER_SCRIPT.to_string()
    } else {
        format!("{}; {}", blacklist_action(blacklist), WAIT_FOR_DRIVER_SCRIPT)
    };
    vec!["sh".to_string(), "-c".to_string(), script]
}

fn blacklist_action(blacklist: bool) -> String {
    if blacklist {
        format!("echo \"blacklist ionic\" > {}", BLACKLIST_FILE)
    } else {
        format!("rm -f {}", BLACKLIST_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::NetworkConfigSpec;

    fn network_config(blacklist: Option<bool>) -> NetworkConfig {
        let mut config = NetworkConfig::new("netcfg", NetworkConfigSpec::default());
        config.spec.driver.blacklist = blacklist;
        config
    }

    fn options(sim_enabled: bool, is_openshift: bool) -> AgentOptions {
        AgentOptions {
            sim_enabled,
            is_openshift,
        }
    }

    fn script(spec: &AgentSpec) -> &str {
        &spec.init_containers[0].command[2]
    }

    #[test]
    fn test_simulation_only_touches_blacklist() {
        for openshift in [false, true] {
            let spec = build_node_labeller_spec(&network_config(Some(true)), &options(true, openshift));
            assert_eq!(script(&spec), format!("echo \"blacklist ionic\" > {}", BLACKLIST_FILE));

            let spec = build_node_labeller_spec(&network_config(Some(false)), &options(true, openshift));
            assert_eq!(script(&spec), format!("rm -f {}", BLACKLIST_FILE));
        }
    }

    #[test]
    fn test_openshift_only_waits() {
        for blacklist in [None, Some(false), Some(true)] {
            let spec = build_node_labeller_spec(&network_config(blacklist), &options(false, true));
            assert_eq!(script(&spec), WAIT_FOR_DRIVER_SCRIPT);
        }
    }

    #[test]
    fn test_hardware_updates_blacklist_then_waits() {
        let spec = build_node_labeller_spec(&network_config(Some(true)), &options(false, false));
        assert!(script(&spec).starts_with("echo \"blacklist ionic\" > /host-etc/modprobe.d/"));
        assert!(script(&spec).ends_with(WAIT_FOR_DRIVER_SCRIPT));

        let spec = build_node_labeller_spec(&network_config(None), &options(false, false));
        assert!(script(&spec).starts_with("rm -f /host-etc/modprobe.d/blacklist-ionic-netop.conf; "));
    }

    #[test]
    fn test_sim_env_on_main_container() {
        let spec = build_node_labeller_spec(&network_config(None), &options(true, false));
        let env: Vec<_> = spec
            .main_container
            .env
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_deref()))
            .collect();
        assert_eq!(env, vec![("DS_NODE_NAME", None), ("SIM_ENABLE", Some("1"))]);

        let spec = build_node_labeller_spec(&network_config(None), &options(false, false));
        assert_eq!(spec.main_container.env.len(), 1);
    }

    #[test]
    fn test_volumes_and_defaults() {
        let mut config = network_config(None);
        config.spec.device_plugin.enable_node_labeller = Some(true);

        let spec = build_node_labeller_spec(&config, &options(false, false));

        assert!(spec.enable);
        assert_eq!(spec.service_account_name, NODE_LABELLER_SERVICE_ACCOUNT);
        assert_eq!(spec.main_container.effective_image(), DEFAULT_NODE_LABELLER_IMAGE);
        let paths: Vec<_> = spec
            .volumes
            .iter()
            .filter_map(|v| v.host_path.as_ref().map(|h| h.path.as_str()))
            .collect();
        assert_eq!(paths, vec!["/dev", "/sys", "/lib/modules", "/etc"]);
        let init_mounts: Vec<_> = spec.init_containers[0]
            .volume_mounts
            .iter()
            .map(|m| m.mount_path.as_str())
            .collect();
        assert_eq!(init_mounts, vec!["/sys", "/host-etc"]);
    }
}
