use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Role a host takes in the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HostRole {
    Master,
    Worker,
}

/// Identity and networking of a single host
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<HostRole>,

    /// Interface name to MAC bindings used to recognise the host
    #[serde(default, alias = "macToIface", skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<InterfaceBinding>,

    /// Full nmstate network configuration document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<serde_json::Value>,

    /// Hints selecting the installation disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_device_hints: Option<RootDeviceHints>,
}

/// Binds an interface name to the MAC address it is found by
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceBinding {
    pub name: String,

    #[serde(alias = "mac")]
    pub mac_address: String,
}

/// Installation disk selection hints
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RootDeviceHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hctl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size_gigabytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wwn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotational: Option<bool>,
}

impl HostSpec {
    /// Name used when reporting problems with this host
    pub fn display_name(&self, index: usize) -> String {
        match &self.hostname {
            Some(name) => name.clone(),
            None => format!("host[{}]", index),
        }
    }

    /// Statically configured IPv4 addresses in the host's network configuration
    ///
    /// Walks `interfaces[].ipv4.address[].ip` of the nmstate document.
    pub fn static_ipv4_addresses(&self) -> Vec<String> {
        let Some(config) = &self.network_config else {
            return Vec::new();
        };

        config
            .get("interfaces")
            .and_then(|i| i.as_array())
            .into_iter()
            .flatten()
            .filter_map(|iface| iface.get("ipv4"))
            .filter_map(|ipv4| ipv4.get("address").and_then(|a| a.as_array()))
            .flatten()
            .filter_map(|addr| addr.get("ip").and_then(|ip| ip.as_str()))
            .map(str::to_string)
            .collect()
    }
}
