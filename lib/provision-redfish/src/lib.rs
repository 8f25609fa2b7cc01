//! Redfish virtual media integration
//!
//! Attaches a boot image to a host through its BMC, verifies the insertion,
//! sets a one-time boot override and optionally resets the host.

pub mod client;
pub mod media;
pub mod mounter;

pub use client::{BmcCredentials, HttpTransport, RedfishRequest, RedfishTransport, TransportError};
pub use media::{MountRequest, VirtualMediaController};
pub use mounter::{MediaMounter, RedfishMounter};
