//! Per-host mount entry point used by the orchestrator

use crate::client::{BmcCredentials, HttpTransport};
use crate::media::{MountRequest, VirtualMediaController, MEDIA_POLL_ATTEMPTS, MEDIA_POLL_INTERVAL};
use async_trait::async_trait;
use provision_api::{BmcHost, MountReport};
use provision_core::{Clock, PollPolicy, ProvisionError, Result, TokioClock};
use std::sync::Arc;
use std::time::Duration;

/// Mounts a boot image on one managed host
#[async_trait]
pub trait MediaMounter: Send + Sync {
    async fn mount(&self, host: &BmcHost, image_url: &str) -> Result<MountReport>;
}

/// Mounts through the host's Redfish API, one fresh controller per call
pub struct RedfishMounter {
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
    policy: PollPolicy,
}

impl RedfishMounter {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(TokioClock),
            request_timeout: Duration::from_secs(30),
            policy: PollPolicy::attempts(MEDIA_POLL_INTERVAL, MEDIA_POLL_ATTEMPTS),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Timeout of a single Redfish HTTP request
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for RedfishMounter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaMounter for RedfishMounter {
    async fn mount(&self, host: &BmcHost, image_url: &str) -> Result<MountReport> {
        let transport = HttpTransport::new(
            &host.redfish_endpoint,
            BmcCredentials {
                username: host.username.clone(),
                password: host.password.clone(),
            },
            host.insecure,
            self.request_timeout,
        )
        .map_err(|e| ProvisionError::media_mount(host.display_name(), e.to_string()))?;

        let request = MountRequest {
            image_url: image_url.to_string(),
            slot: host.boot_device().to_string(),
            power_action: host.power_action,
        };

        VirtualMediaController::new(host.display_name(), transport, self.clock.clone())
            .with_poll_policy(self.policy.clone())
            .mount(&request)
            .await
    }
}
