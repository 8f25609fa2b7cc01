//! agent-config.yaml document

use provision_api::{ClusterSpec, HostSpec};
use provision_core::Result;
use serde::{Deserialize, Serialize};

use crate::install_config::Metadata;

/// Agent configuration: rendezvous host and per-host identity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,

    #[serde(rename = "rendezvousIP", default, skip_serializing_if = "Option::is_none")]
    pub rendezvous_ip: Option<String>,

    /// Host entries keep the installer's field names
    /// (hostname, role, interfaces[].macAddress, networkConfig, rootDeviceHints)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<HostSpec>,
}

impl AgentConfig {
    pub fn from_spec(spec: &ClusterSpec) -> Self {
        Self {
            api_version: "v1beta1".to_string(),
            kind: "AgentConfig".to_string(),
            metadata: Metadata {
                name: spec.cluster_name.clone(),
            },
            rendezvous_ip: spec.rendezvous_ip().map(str::to_string),
            hosts: spec.hosts().to_vec(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install_config::tests::spec;
    use provision_api::{AgentSpec, HostRole, InterfaceBinding, RootDeviceHints};
    use serde_json::json;

    #[test]
    fn test_document_fields() {
        let mut spec = spec();
        spec.control_plane_replicas = 3;
        spec.agent = Some(AgentSpec {
            rendezvous_ip: Some("192.168.111.80".to_string()),
            hosts: vec![
                HostSpec {
                    hostname: Some("master-0".to_string()),
                    role: Some(HostRole::Master),
                    interfaces: vec![InterfaceBinding {
                        name: "eno1".to_string(),
                        mac_address: "00:ef:44:21:e6:a5".to_string(),
                    }],
                    network_config: Some(json!({
                        "interfaces": [{
                            "name": "eno1",
                            "type": "ethernet",
                            "state": "up",
                            "mac-address": "00:ef:44:21:e6:a5",
                            "ipv4": {"enabled": true, "dhcp": false, "address": [{"ip": "192.168.111.80", "prefix-length": 24}]}
                        }]
                    })),
                    root_device_hints: Some(RootDeviceHints {
                        device_name: Some("/dev/sda".to_string()),
                        ..Default::default()
                    }),
                },
                HostSpec {
                    hostname: Some("worker-0".to_string()),
                    role: Some(HostRole::Worker),
                    interfaces: vec![InterfaceBinding {
                        name: "eno1".to_string(),
                        mac_address: "00:ef:44:21:e6:b6".to_string(),
                    }],
                    ..Default::default()
                },
            ],
        });

        let yaml = AgentConfig::from_spec(&spec).to_yaml().unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(doc["apiVersion"], "v1beta1");
        assert_eq!(doc["kind"], "AgentConfig");
        assert_eq!(doc["metadata"]["name"], "edge");
        assert_eq!(doc["rendezvousIP"], "192.168.111.80");
        let master = &doc["hosts"][0];
        assert_eq!(master["hostname"], "master-0");
        assert_eq!(master["role"], "master");
        assert_eq!(master["interfaces"][0]["name"], "eno1");
        assert_eq!(master["interfaces"][0]["macAddress"], "00:ef:44:21:e6:a5");
        assert_eq!(
            master["networkConfig"]["interfaces"][0]["ipv4"]["address"][0]["ip"],
            "192.168.111.80"
        );
        assert_eq!(master["rootDeviceHints"]["deviceName"], "/dev/sda");
        let worker = &doc["hosts"][1];
        assert_eq!(worker["role"], "worker");
        assert!(worker.get("networkConfig").is_none());
    }

    #[test]
    fn test_single_node_without_agent_block() {
        let yaml = AgentConfig::from_spec(&spec()).to_yaml().unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(doc.get("rendezvousIP").is_none());
        assert!(doc.get("hosts").is_none());
    }
}
