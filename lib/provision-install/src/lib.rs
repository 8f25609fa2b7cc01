//! Install completion
//!
//! Waits for the installer to report a finished cluster and reads back the
//! credentials it leaves in the working directory.

pub mod credentials;
pub mod strategy;
pub mod waiter;

pub use credentials::{console_url, read_complete_credentials};
pub use strategy::{CompletionWaiter, DelegateWaiter, FilePoller};
pub use waiter::InstallWaiter;
