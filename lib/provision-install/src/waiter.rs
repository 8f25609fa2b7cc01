//! Install waiter

use crate::credentials::{console_url, read_complete_credentials};
use crate::strategy::CompletionWaiter;
use provision_api::{Credentials, InstallProgress};
use provision_core::{ProvisionError, Result, WorkDir};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default bound on the whole installation
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(90 * 60);

/// Waits for one attempt's installation and collects its credentials
pub struct InstallWaiter {
    strategy: Arc<dyn CompletionWaiter>,
    timeout: Duration,
    progress: InstallProgress,
}

impl InstallWaiter {
    pub fn new(strategy: Arc<dyn CompletionWaiter>, timeout: Duration) -> Self {
        Self {
            strategy,
            timeout,
            progress: InstallProgress::Waiting,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn progress(&self) -> &InstallProgress {
        &self.progress
    }

    /// Block until the installer reports completion, then read the credentials.
    ///
    /// Credentials are only returned when both files are complete.
    pub async fn wait(&mut self, workdir: &WorkDir) -> Result<Credentials> {
        self.progress = InstallProgress::Waiting;
        info!(
            strategy = self.strategy.name(),
            timeout = ?self.timeout,
            workdir = %workdir.path().display(),
            "Waiting for installation to complete"
        );

        if let Err(e) = self.strategy.wait(workdir, self.timeout).await {
            if e.is_indeterminate() {
                warn!("Installation did not complete in time; the cluster may still be installing");
                self.progress = InstallProgress::TimedOut;
            }
            return Err(e);
        }

        let (kubeconfig, kubeadmin_password) = read_complete_credentials(workdir)?.ok_or_else(|| {
            ProvisionError::Internal(format!(
                "installer reported completion but credentials in {} are incomplete",
                workdir.path().display()
            ))
        })?;
        let credentials = Credentials {
            kubeconfig,
            kubeadmin_password,
            console_url: console_url(workdir)?,
        };

        info!(console = %credentials.console_url, "Installation complete");
        self.progress = InstallProgress::Complete(credentials.clone());
        Ok(credentials)
    }
}
