//! v1alpha1 provisioning types
//!
//! Field names follow the camelCase keys of the cluster spec file.

pub mod bmc;
pub mod cluster;
pub mod host;
pub mod status;

pub use bmc::{BmcHost, PowerAction};
pub use cluster::{
    AgentSpec, ClusterNetwork, ClusterSpec, MirrorSpec, NetworkingSpec, ServeFrom, SpecLoadError,
};
pub use host::{HostRole, HostSpec, InterfaceBinding, RootDeviceHints};
pub use status::{Credentials, GeneratedAssets, InstallProgress, MediaMountState, MountReport};
