//! install-config.yaml document

use crate::mirror::mirror_location;
use provision_api::ClusterSpec;
use provision_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Release repositories and the path they are mirrored under
pub const RELEASE_REPOSITORIES: [(&str, &str); 2] = [
    ("quay.io/openshift-release-dev/ocp-release", "openshift/release-images"),
    ("quay.io/openshift-release-dev/ocp-v4.0-art-dev", "openshift/release"),
];

/// Installer configuration consumed by `agent create image`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    pub api_version: String,
    pub base_domain: String,
    pub metadata: Metadata,
    pub networking: Networking,
    pub compute: Vec<MachinePool>,
    pub control_plane: MachinePool,
    pub platform: Value,
    pub pull_secret: String,
    pub ssh_key: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_digest_sources: Vec<ImageDigestSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_trust_bundle: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    pub network_type: String,
    pub cluster_network: Vec<ClusterNetworkEntry>,
    pub service_network: Vec<String>,
    pub machine_network: Vec<MachineNetworkEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    pub cidr: String,
    pub host_prefix: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineNetworkEntry {
    pub cidr: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachinePool {
    pub name: String,
    pub replicas: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageDigestSource {
    pub source: String,
    pub mirrors: Vec<String>,
}

impl InstallConfig {
    /// Build the document for `spec`; `trust_bundle` is the mirror's CA bundle contents
    pub fn from_spec(spec: &ClusterSpec, trust_bundle: Option<String>) -> Self {
        let networking = &spec.networking;

        let mut platform = Map::new();
        platform.insert(spec.platform.clone(), Value::Object(Map::new()));

        let image_digest_sources = spec
            .mirror
            .as_ref()
            .map(|mirror| {
                RELEASE_REPOSITORIES
                    .iter()
                    .map(|(source, path)| ImageDigestSource {
                        source: source.to_string(),
                        mirrors: vec![mirror_location(&mirror.endpoint, path)],
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            api_version: "v1".to_string(),
            base_domain: spec.base_domain.clone(),
            metadata: Metadata {
                name: spec.cluster_name.clone(),
            },
            networking: Networking {
                network_type: networking.network_type.clone(),
                cluster_network: vec![ClusterNetworkEntry {
                    cidr: networking.cluster_network.cidr.clone(),
                    host_prefix: networking.cluster_network.host_prefix,
                }],
                service_network: vec![networking.service_cidr.clone()],
                machine_network: vec![MachineNetworkEntry {
                    cidr: networking.machine_cidr.clone(),
                }],
            },
            compute: vec![MachinePool {
                name: "worker".to_string(),
                replicas: spec.compute_replicas,
            }],
            control_plane: MachinePool {
                name: "master".to_string(),
                replicas: spec.control_plane_replicas,
            },
            platform: Value::Object(platform),
            pull_secret: spec.pull_secret.clone(),
            ssh_key: spec.ssh_pub_key.clone(),
            image_digest_sources,
            additional_trust_bundle: trust_bundle,
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Web console of the installed cluster
    pub fn console_url(&self) -> String {
        format!(
            "https://console-openshift-console.apps.{}.{}",
            self.metadata.name, self.base_domain
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use provision_api::v1alpha1::cluster::{ClusterNetwork, NetworkingSpec};
    use provision_api::MirrorSpec;
    use std::path::PathBuf;

    pub(crate) fn spec() -> ClusterSpec {
        ClusterSpec {
            release_image: Some("quay.io/openshift-release-dev/ocp-release:4.16.0-x86_64".to_string()),
            base_domain: "example.com".to_string(),
            cluster_name: "edge".to_string(),
            platform: "none".to_string(),
            networking: NetworkingSpec {
                cluster_network: ClusterNetwork {
                    cidr: "10.128.0.0/14".to_string(),
                    host_prefix: 23,
                },
                service_cidr: "172.30.0.0/16".to_string(),
                machine_cidr: "192.168.111.0/24".to_string(),
                network_type: "OVNKubernetes".to_string(),
            },
            control_plane_replicas: 1,
            compute_replicas: 0,
            pull_secret: r#"{"auths":{"quay.io":{"auth":"Zm9vOmJhcg=="}}}"#.to_string(),
            ssh_pub_key: "ssh-ed25519 AAAAC3Nza test@example".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_document_fields() {
        let config = InstallConfig::from_spec(&spec(), None);
        let yaml = config.to_yaml().unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(doc["apiVersion"], "v1");
        assert_eq!(doc["baseDomain"], "example.com");
        assert_eq!(doc["metadata"]["name"], "edge");
        assert_eq!(doc["networking"]["networkType"], "OVNKubernetes");
        assert_eq!(doc["networking"]["clusterNetwork"][0]["cidr"], "10.128.0.0/14");
        assert_eq!(doc["networking"]["clusterNetwork"][0]["hostPrefix"], 23);
        assert_eq!(doc["networking"]["serviceNetwork"][0], "172.30.0.0/16");
        assert_eq!(doc["networking"]["machineNetwork"][0]["cidr"], "192.168.111.0/24");
        assert_eq!(doc["compute"][0]["name"], "worker");
        assert_eq!(doc["compute"][0]["replicas"], 0);
        assert_eq!(doc["controlPlane"]["name"], "master");
        assert_eq!(doc["controlPlane"]["replicas"], 1);
        assert!(doc["platform"]["none"].is_mapping());
        assert_eq!(doc["sshKey"], "ssh-ed25519 AAAAC3Nza test@example");
        assert!(doc.get("imageDigestSources").is_none());
        assert!(doc.get("additionalTrustBundle").is_none());
    }

    #[test]
    fn test_mirror_overrides() {
        let mut spec = spec();
        spec.mirror = Some(MirrorSpec {
            endpoint: "mirror.local:5000".to_string(),
            ca_bundle: Some(PathBuf::from("/etc/mirror/ca.pem")),
            registries_conf: Some(PathBuf::from("/etc/mirror/registries.conf")),
            auth_file: None,
        });
        let pem = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

        let config = InstallConfig::from_spec(&spec, Some(pem.to_string()));

        assert_eq!(
            config.image_digest_sources,
            vec![
                ImageDigestSource {
                    source: "quay.io/openshift-release-dev/ocp-release".to_string(),
                    mirrors: vec!["mirror.local:5000/openshift/release-images".to_string()],
                },
                ImageDigestSource {
                    source: "quay.io/openshift-release-dev/ocp-v4.0-art-dev".to_string(),
                    mirrors: vec!["mirror.local:5000/openshift/release".to_string()],
                },
            ]
        );
        assert_eq!(config.additional_trust_bundle.as_deref(), Some(pem));

        // Written and read back unchanged
        let parsed = InstallConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_console_url() {
        let config = InstallConfig::from_spec(&spec(), None);
        assert_eq!(
            config.console_url(),
            "https://console-openshift-console.apps.edge.example.com"
        );
    }
}
