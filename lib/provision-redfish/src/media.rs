//! Virtual media mount state machine
//!
//! One controller drives one host through
//! `Unmounted -> Inserting -> Verifying -> Mounted`, or into `Failed(reason)`
//! as soon as a Redfish call or the insertion check fails. A controller
//! reaches exactly one terminal state and never retries.

use crate::client::{
    insert_media_path, virtual_media_path, RedfishRequest, RedfishTransport, RESET_PATH,
    SYSTEM_PATH,
};
use chrono::Utc;
use provision_api::{MediaMountState, MountReport, PowerAction};
use provision_core::{poll_until, Clock, PollOutcome, PollPolicy, ProvisionError, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval between two insertion checks
pub const MEDIA_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Number of insertion checks before giving up
pub const MEDIA_POLL_ATTEMPTS: u32 = 30;

/// What to mount on a host and what to do afterwards
#[derive(Clone, Debug)]
pub struct MountRequest {
    pub image_url: String,
    /// Virtual media slot, also used as boot override target
    pub slot: String,
    pub power_action: Option<PowerAction>,
}

pub struct VirtualMediaController<T> {
    host: String,
    transport: T,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
    state: MediaMountState,
    transitions: Vec<MediaMountState>,
}

impl<T: RedfishTransport> VirtualMediaController<T> {
    pub fn new(host: impl Into<String>, transport: T, clock: Arc<dyn Clock>) -> Self {
        Self {
            host: host.into(),
            transport,
            clock,
            policy: PollPolicy::attempts(MEDIA_POLL_INTERVAL, MEDIA_POLL_ATTEMPTS),
            state: MediaMountState::Unmounted,
            transitions: vec![MediaMountState::Unmounted],
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> &MediaMountState {
        &self.state
    }

    /// Every state the controller went through, starting with `Unmounted`
    pub fn transitions(&self) -> &[MediaMountState] {
        &self.transitions
    }

    /// Mount the image, then set the boot override and run the power action.
    ///
    /// Fails with `ProvisionError::MediaMount` when insertion cannot be
    /// requested or verified, or when the requested power action fails.
    pub async fn mount(&mut self, request: &MountRequest) -> Result<MountReport> {
        if self.state != MediaMountState::Unmounted {
            return Err(ProvisionError::Internal(format!(
                "virtual media controller for {} already ran ({})",
                self.host, self.state
            )));
        }

        info!(host = %self.host, slot = %request.slot, image = %request.image_url, "Inserting virtual media");
        self.transition(MediaMountState::Inserting);

        let insert = RedfishRequest::post(
            insert_media_path(&request.slot),
            json!({ "Image": request.image_url, "Inserted": true }),
        );
        if let Err(e) = self.transport.send(insert).await {
            return Err(self.fail(format!("insert media: {}", e)));
        }

        self.transition(MediaMountState::Verifying);
        let media = match self.wait_for_insertion(&request.slot).await {
            Ok(PollOutcome::Ready(media)) => media,
            Ok(PollOutcome::Exhausted { attempts, .. }) => {
                warn!(host = %self.host, attempts, "Virtual media never reported as inserted");
                return Err(self.fail("timeout"));
            }
            Err(e) => return Err(self.fail(format!("verify media: {}", e))),
        };
        self.transition(MediaMountState::Mounted);
        info!(host = %self.host, "Virtual media mounted");

        self.set_boot_override(&request.slot).await;

        let last_action = match request.power_action {
            Some(action) => {
                self.power(action).await?;
                action.to_string()
            }
            None => "none".to_string(),
        };

        Ok(MountReport {
            host: self.host.clone(),
            state: self.state.clone(),
            last_action,
            last_task_state: task_state(&media),
            mounted_at: Utc::now(),
        })
    }

    async fn wait_for_insertion(
        &self,
        slot: &str,
    ) -> std::result::Result<PollOutcome<Value>, crate::TransportError> {
        let transport = &self.transport;
        let host = self.host.as_str();
        let path = virtual_media_path(slot);

        poll_until(
            self.clock.as_ref(),
            &self.policy,
            "virtual media insertion",
            |attempt| {
                let path = path.clone();
                async move {
                    let media = transport.send(RedfishRequest::get(path)).await?;
                    let inserted = media
                        .get("Inserted")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    debug!(host = %host, attempt, inserted, "Polled virtual media");
                    Ok(inserted.then_some(media))
                }
            },
        )
        .await
    }

    // Some firmware ignores or rejects the override although it boots from
    // the mounted media anyway.
    async fn set_boot_override(&self, slot: &str) {
        let body = json!({
            "Boot": {
                "BootSourceOverrideTarget": slot,
                "BootSourceOverrideEnabled": "Once",
            }
        });
        match self.transport.send(RedfishRequest::patch(SYSTEM_PATH, body)).await {
            Ok(_) => debug!(host = %self.host, target = %slot, "Boot override set"),
            Err(e) => warn!(host = %self.host, error = %e, "Failed to set boot override, continuing"),
        }
    }

    async fn power(&self, action: PowerAction) -> Result<()> {
        info!(host = %self.host, action = %action, "Issuing power action");
        let body = json!({ "ResetType": action.as_str() });
        self.transport
            .send(RedfishRequest::post(RESET_PATH, body))
            .await
            .map(|_| ())
            .map_err(|e| ProvisionError::media_mount(&self.host, format!("power action {}: {}", action, e)))
    }

    fn transition(&mut self, next: MediaMountState) {
        debug!(host = %self.host, from = %self.state, to = %next, "Virtual media state change");
        self.state = next.clone();
        self.transitions.push(next);
    }

    fn fail(&mut self, reason: impl Into<String>) -> ProvisionError {
        let reason = reason.into();
        warn!(host = %self.host, reason = %reason, "Virtual media mount failed");
        self.transition(MediaMountState::Failed(reason.clone()));
        ProvisionError::media_mount(&self.host, reason)
    }
}

/// Summarise the media resource: its Redfish status state when present
fn task_state(media: &Value) -> String {
    media
        .pointer("/Status/State")
        .and_then(Value::as_str)
        .unwrap_or("Inserted")
        .to_string()
}
