//! Core provisioning functionality
//!
//! This library provides:
//! - The error taxonomy shared by every provisioning stage
//! - Cluster spec validation, run before any side effect
//! - The working directory that owns an attempt's artifacts
//! - An injectable clock and the bounded polling loop built on it
//! - Execution of the external installer processes

pub mod clock;
pub mod error;
pub mod poll;
pub mod process;
pub mod validate;
pub mod workdir;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{ProvisionError, Result, ValidationError};
pub use poll::{poll_until, PollOutcome, PollPolicy};
pub use validate::validate;
pub use workdir::WorkDir;
