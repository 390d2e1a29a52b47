//! Prints the CustomResourceDefinition manifests as a multi-document YAML stream.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/bases/crds.yaml`

use anyhow::Result;
use crds::{AINIC, NetworkConfig};
use kube::CustomResourceExt;

fn main() -> Result<()> {
    for crd in [AINIC::crd(), NetworkConfig::crd()] {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
