//! Installer asset generation
//!
//! Turns a validated cluster spec into the installer's input documents,
//! runs the image builder, and optionally serves the resulting boot image
//! to the hosts' BMCs.

pub mod agent_config;
pub mod builder;
pub mod generator;
pub mod install_config;
pub mod mirror;
pub mod serve;

pub use agent_config::AgentConfig;
pub use builder::{ImageBuildRequest, ImageBuilder, InstallerCommand};
pub use generator::AssetGenerator;
pub use install_config::InstallConfig;
pub use mirror::{MirrorArtifacts, MirrorRegistry, MirrorRegistryArgs};
pub use serve::{BoundFileServer, FileServer, ServeError};
