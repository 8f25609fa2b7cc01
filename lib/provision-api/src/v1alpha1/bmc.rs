use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Virtual media slot used when a host does not name one
pub const DEFAULT_BOOT_DEVICE: &str = "Cd";

/// A host whose boot image is attached through its BMC's Redfish API
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BmcHost {
    /// Label used in logs and errors; defaults to the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Redfish base URL, e.g. https://10.0.0.10
    pub redfish_endpoint: String,

    pub username: String,

    pub password: String,

    /// Boot image URL for this host; falls back to the served image
    #[serde(default, rename = "isoURL", alias = "isoUrl", skip_serializing_if = "Option::is_none")]
    pub iso_url: Option<String>,

    /// Virtual media slot and boot override target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_device: Option<String>,

    /// Power action issued once the media is mounted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_action: Option<PowerAction>,

    /// Accept self-signed BMC certificates
    #[serde(default)]
    pub insecure: bool,
}

impl BmcHost {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.redfish_endpoint)
    }

    pub fn boot_device(&self) -> &str {
        self.boot_device.as_deref().unwrap_or(DEFAULT_BOOT_DEVICE)
    }
}

/// Redfish ResetType values
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PowerAction {
    On,
    ForceOff,
    GracefulShutdown,
    GracefulRestart,
    ForceRestart,
    Nmi,
    ForceOn,
    PushPowerButton,
    PowerCycle,
}

impl PowerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::On => "On",
            PowerAction::ForceOff => "ForceOff",
            PowerAction::GracefulShutdown => "GracefulShutdown",
            PowerAction::GracefulRestart => "GracefulRestart",
            PowerAction::ForceRestart => "ForceRestart",
            PowerAction::Nmi => "Nmi",
            PowerAction::ForceOn => "ForceOn",
            PowerAction::PushPowerButton => "PushPowerButton",
            PowerAction::PowerCycle => "PowerCycle",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
