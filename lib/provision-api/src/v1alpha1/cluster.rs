use crate::v1alpha1::{BmcHost, HostSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Network type accepted by the installer for agent-based clusters
pub const SUPPORTED_NETWORK_TYPE: &str = "OVNKubernetes";

/// Port used by the boot image file server when none is given
pub const DEFAULT_SERVE_PORT: u16 = 8080;

/// Errors raised while loading a cluster spec file
#[derive(Error, Debug)]
pub enum SpecLoadError {
    #[error("failed to read cluster spec {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse cluster spec: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// ClusterSpec declares the cluster a provisioning attempt brings up.
///
/// It is read once and never mutated for the lifetime of an attempt.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Release image pulled by the installer (overrides the installer's pinned release)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_image: Option<String>,

    /// Base DNS domain of the cluster
    pub base_domain: String,

    /// Cluster name, prefixed to the base domain
    pub cluster_name: String,

    /// Installer platform (only "none" and "baremetal" make sense for agent installs)
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Cluster, service and machine networks
    pub networking: NetworkingSpec,

    /// Number of control plane nodes (1, or 3 and more)
    pub control_plane_replicas: u32,

    /// Number of compute nodes
    #[serde(default)]
    pub compute_replicas: u32,

    /// Pull secret in dockerconfigjson form
    pub pull_secret: String,

    /// Public SSH key installed for the core user
    pub ssh_pub_key: String,

    /// Agent configuration: rendezvous host and per-host settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentSpec>,

    /// Registry mirror for disconnected installs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror: Option<MirrorSpec>,

    /// Working directory to (re)use; a fresh temporary one is created when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,

    /// Serve the working directory over HTTP so BMCs can fetch the boot image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve_from: Option<ServeFrom>,

    /// Also emit PXE artifacts next to the boot image
    #[serde(default, rename = "emitPXE")]
    pub emit_pxe: bool,

    /// Hosts whose boot media is attached through their BMC
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bmc: Vec<BmcHost>,
}

/// Cluster networking configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct NetworkingSpec {
    /// Pod network
    #[serde(rename = "clusterNetwork")]
    pub cluster_network: ClusterNetwork,

    /// Service virtual IP range
    #[serde(rename = "serviceCIDR")]
    pub service_cidr: String,

    /// Range the hosts' own addresses live in
    #[serde(rename = "machineCIDR")]
    pub machine_cidr: String,

    /// CNI plugin
    #[serde(rename = "networkType", default = "default_network_type")]
    pub network_type: String,
}

/// Pod network block and the prefix carved out per node
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    pub cidr: String,

    #[serde(default = "default_host_prefix")]
    pub host_prefix: u8,
}

impl Default for ClusterNetwork {
    fn default() -> Self {
        Self {
            cidr: String::new(),
            host_prefix: default_host_prefix(),
        }
    }
}

/// Agent settings shared by all hosts
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct AgentSpec {
    /// Address of the host coordinating bootstrap
    #[serde(rename = "rendezvousIP", default, skip_serializing_if = "Option::is_none")]
    pub rendezvous_ip: Option<String>,

    /// Per-host identity and networking
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
}

/// Registry mirror override
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MirrorSpec {
    /// Registry host (and optional port) serving the mirrored release
    pub endpoint: String,

    /// PEM bundle trusted for the mirror
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,

    /// containers-registries.conf(5) file rewriting release pulls to the mirror
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registries_conf: Option<PathBuf>,

    /// Registry auth file handed to the image builder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_file: Option<PathBuf>,
}

/// Where BMCs fetch the boot image from
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ServeFrom {
    /// Address hosts' BMCs use to reach this machine
    pub address: String,

    #[serde(default = "default_serve_port")]
    pub port: u16,
}

impl ClusterSpec {
    /// Parse a spec from YAML (or JSON) text
    pub fn from_yaml(text: &str) -> Result<Self, SpecLoadError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a spec file
    pub fn from_file(path: &Path) -> Result<Self, SpecLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| SpecLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Total number of nodes in the cluster, saturating at `u32::MAX`
    pub fn total_replicas(&self) -> u32 {
        self.control_plane_replicas.saturating_add(self.compute_replicas)
    }

    /// Rendezvous IP, if the agent block sets one
    pub fn rendezvous_ip(&self) -> Option<&str> {
        self.agent.as_ref()?.rendezvous_ip.as_deref()
    }

    /// Per-host settings, empty when no agent block is given
    pub fn hosts(&self) -> &[HostSpec] {
        self.agent.as_ref().map(|a| a.hosts.as_slice()).unwrap_or(&[])
    }
}

fn default_platform() -> String {
    "none".to_string()
}

fn default_network_type() -> String {
    SUPPORTED_NETWORK_TYPE.to_string()
}

fn default_host_prefix() -> u8 {
    23
}

fn default_serve_port() -> u16 {
    DEFAULT_SERVE_PORT
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
releaseImage: quay.io/openshift-release-dev/ocp-release:4.16.0-x86_64
baseDomain: example.com
clusterName: edge
networking:
  clusterNetwork:
    cidr: 10.128.0.0/14
  serviceCIDR: 172.30.0.0/16
  machineCIDR: 192.168.111.0/24
controlPlaneReplicas: 3
computeReplicas: 2
pullSecret: '{"auths":{}}'
sshPubKey: ssh-ed25519 AAAA test
agent:
  rendezvousIP: 192.168.111.80
  hosts:
    - hostname: master-0
      role: master
      interfaces:
        - name: eno1
          macAddress: "00:ef:44:21:e6:a5"
serveFrom:
  address: 192.168.111.1
emitPXE: true
bmc:
  - redfishEndpoint: https://10.0.0.10
    username: admin
    password: secret
    powerAction: ForceRestart
"#;

    #[test]
    fn test_parse_spec_with_defaults() {
        let spec = ClusterSpec::from_yaml(SPEC).expect("spec should parse");
        assert_eq!(spec.cluster_name, "edge");
        assert_eq!(spec.platform, "none");
        assert_eq!(spec.networking.network_type, SUPPORTED_NETWORK_TYPE);
        assert_eq!(spec.networking.cluster_network.host_prefix, 23);
        assert_eq!(spec.total_replicas(), 5);
        assert_eq!(spec.rendezvous_ip(), Some("192.168.111.80"));
        assert_eq!(spec.hosts().len(), 1);
        assert_eq!(spec.serve_from.as_ref().map(|s| s.port), Some(DEFAULT_SERVE_PORT));
        assert!(spec.emit_pxe);
        assert_eq!(spec.bmc.len(), 1);
    }

    #[test]
    fn test_hosts_empty_without_agent() {
        let spec = ClusterSpec::default();
        assert!(spec.hosts().is_empty());
        assert_eq!(spec.rendezvous_ip(), None);
    }

    #[test]
    fn test_missing_file() {
        let err = ClusterSpec::from_file(Path::new("/nonexistent/cluster.yaml")).unwrap_err();
        assert!(matches!(err, SpecLoadError::Io { .. }));
    }
}
