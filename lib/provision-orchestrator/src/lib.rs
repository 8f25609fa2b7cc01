//! Provisioning orchestration
//!
//! Sequences validation, asset generation, per-host media mounts and the
//! install wait for one provisioning attempt.

pub mod metrics;
pub mod provisioner;

pub use metrics::ProvisionMetrics;
pub use provisioner::{ProvisionOutcome, Provisioner};
