//! Cluster provisioning API types
//!
//! This library defines the declarative input and the observable outputs of a
//! provisioning attempt:
//! - ClusterSpec: the cluster to bring up (networking, replicas, hosts)
//! - BmcHost: a host whose boot media is attached through its BMC
//! - MirrorSpec: disconnected-install registry override
//! - GeneratedAssets, MountReport, Credentials: results of each stage

pub mod v1alpha1;

pub use v1alpha1::{
    AgentSpec, BmcHost, ClusterNetwork, ClusterSpec, Credentials, GeneratedAssets, HostRole,
    HostSpec, InstallProgress, InterfaceBinding, MediaMountState, MirrorSpec, MountReport,
    NetworkingSpec, PowerAction, RootDeviceHints, ServeFrom, SpecLoadError,
};
