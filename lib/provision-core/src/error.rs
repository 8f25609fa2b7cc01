use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors that abort a provisioning attempt
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("invalid cluster spec: {0}")]
    Validation(#[from] ValidationError),

    #[error("{program} exited with {status}: {stderr}")]
    ExternalProcess {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("virtual media mount failed on {host}: {reason}")]
    MediaMount { host: String, reason: String },

    #[error("timed out waiting for installation after {waited:?}")]
    Timeout { waited: Duration },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProvisionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvisionError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn media_mount(host: impl Into<String>, reason: impl Into<String>) -> Self {
        ProvisionError::MediaMount {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// True when the installation may still be progressing on the hosts
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, ProvisionError::Timeout { .. })
    }
}

/// A cluster spec rejected before any file or network I/O
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("networking.networkType: unsupported network type {found:?}, only {expected:?} is supported")]
    UnsupportedNetworkType {
        found: String,
        expected: &'static str,
    },

    #[error("controlPlaneReplicas: {0} is invalid, use 1 for single-node or at least 3")]
    InvalidControlPlaneReplicas(u32),

    #[error("{field}: invalid CIDR {value:?}")]
    InvalidCidr { field: &'static str, value: String },

    #[error("networking: {first} {first_cidr} overlaps {second} {second_cidr}")]
    OverlappingCidrs {
        first: &'static str,
        first_cidr: String,
        second: &'static str,
        second_cidr: String,
    },

    #[error("agent.rendezvousIP: required for a cluster of {replicas} nodes")]
    MissingRendezvousIp { replicas: u32 },

    #[error("agent.rendezvousIP: invalid address {0:?}")]
    InvalidRendezvousIp(String),

    #[error("agent.rendezvousIP: {ip} is outside machine network {machine_cidr}")]
    RendezvousOutsideMachineNetwork { ip: String, machine_cidr: String },

    #[error("agent.hosts: host {host} has invalid IPv4 address {address:?}")]
    InvalidHostAddress { host: String, address: String },

    #[error("agent.hosts: host {host} address {address} is outside machine network {machine_cidr}")]
    HostAddressOutsideMachineNetwork {
        host: String,
        address: String,
        machine_cidr: String,
    },

    #[error("mirror: endpoint {endpoint} also requires {missing}")]
    IncompleteMirror {
        endpoint: String,
        missing: &'static str,
    },

    #[error("bmc: host {host} has no boot image URL, set isoURL or serveFrom")]
    MissingBootImageUrl { host: String },
}

impl ValidationError {
    /// Spec field the error points at
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::UnsupportedNetworkType { .. } => "networking.networkType",
            ValidationError::InvalidControlPlaneReplicas(_) => "controlPlaneReplicas",
            ValidationError::InvalidCidr { field, .. } => field,
            ValidationError::OverlappingCidrs { .. } => "networking",
            ValidationError::MissingRendezvousIp { .. }
            | ValidationError::InvalidRendezvousIp(_)
            | ValidationError::RendezvousOutsideMachineNetwork { .. } => "agent.rendezvousIP",
            ValidationError::InvalidHostAddress { .. }
            | ValidationError::HostAddressOutsideMachineNetwork { .. } => "agent.hosts",
            ValidationError::IncompleteMirror { .. } => "mirror",
            ValidationError::MissingBootImageUrl { .. } => "bmc",
        }
    }
}
