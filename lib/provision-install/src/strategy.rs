//! Ways of observing install completion

use crate::credentials::read_complete_credentials;
use async_trait::async_trait;
use provision_assets::{ImageBuildRequest, InstallerCommand};
use provision_core::{poll_until, process, Clock, PollOutcome, PollPolicy, ProvisionError, Result, WorkDir};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Interval between two credential checks when polling
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Blocks until the installation in `workdir` finishes or `timeout` elapses
#[async_trait]
pub trait CompletionWaiter: Send + Sync {
    /// Returns `ProvisionError::Timeout` once `timeout` has elapsed
    async fn wait(&self, workdir: &WorkDir, timeout: Duration) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Runs the installer's own `agent wait-for` stages.
///
/// A timed out stage stops waiting but leaves the installer process running.
pub struct DelegateWaiter {
    installer: InstallerCommand,
    clock: Arc<dyn Clock>,
    bootstrap_timeout: Option<Duration>,
}

impl DelegateWaiter {
    pub fn new(installer: InstallerCommand, clock: Arc<dyn Clock>) -> Self {
        Self {
            installer,
            clock,
            bootstrap_timeout: None,
        }
    }

    /// Wait for `bootstrap-complete` first, bounded by its own timeout
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = Some(timeout);
        self
    }

    async fn stage(&self, workdir: &WorkDir, stage: &str, timeout: Duration) -> Result<()> {
        let request = ImageBuildRequest {
            workdir: workdir.path().to_path_buf(),
            ..Default::default()
        };
        let mut cmd = self.installer.command(&["wait-for", stage], &request);
        let program = self.installer.program_name();
        let description = format!("Waiting for {}", stage);

        info!(stage = %stage, ?timeout, "Delegating wait to installer");
        tokio::select! {
            result = process::run(&mut cmd, &program, &description) => result,
            _ = self.clock.sleep(timeout) => {
                warn!(stage = %stage, ?timeout, "Installer did not report completion in time");
                Err(ProvisionError::Timeout { waited: timeout })
            }
        }
    }
}

#[async_trait]
impl CompletionWaiter for DelegateWaiter {
    async fn wait(&self, workdir: &WorkDir, timeout: Duration) -> Result<()> {
        if let Some(bootstrap_timeout) = self.bootstrap_timeout {
            self.stage(workdir, "bootstrap-complete", bootstrap_timeout).await?;
        }
        self.stage(workdir, "install-complete", timeout).await
    }

    fn name(&self) -> &'static str {
        "delegate"
    }
}

/// Polls the working directory until both credential files are complete
pub struct FilePoller {
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl FilePoller {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl CompletionWaiter for FilePoller {
    async fn wait(&self, workdir: &WorkDir, timeout: Duration) -> Result<()> {
        let policy = PollPolicy::deadline(self.interval, timeout);
        let outcome = poll_until(self.clock.as_ref(), &policy, "install completion", move |_| async move {
            Ok::<_, ProvisionError>(read_complete_credentials(workdir)?.map(|_| ()))
        })
        .await?;

        match outcome {
            PollOutcome::Ready(()) => Ok(()),
            PollOutcome::Exhausted { attempts, elapsed } => {
                warn!(attempts, ?elapsed, "Credentials did not appear in time");
                Err(ProvisionError::Timeout { waited: elapsed })
            }
        }
    }

    fn name(&self) -> &'static str {
        "poll"
    }
}
