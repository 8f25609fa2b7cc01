//! Provisioning attempt

use crate::metrics::{ProvisionMetrics, OUTCOME_FAILURE, OUTCOME_SUCCESS, OUTCOME_TIMEOUT};
use futures::future::join_all;
use provision_api::{BmcHost, ClusterSpec, Credentials, GeneratedAssets, MountReport};
use provision_assets::AssetGenerator;
use provision_core::{validate, ProvisionError, Result, WorkDir};
use provision_install::{CompletionWaiter, InstallWaiter};
use provision_redfish::MediaMounter;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Everything a successful attempt produced
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionOutcome {
    pub assets: GeneratedAssets,
    pub mounts: Vec<MountReport>,
    pub credentials: Credentials,
}

/// Runs provisioning attempts: validate, generate, mount, wait.
///
/// Every mount runs to completion before the attempt is judged; the first
/// failure in host order aborts it before the install wait starts.
pub struct Provisioner {
    generator: AssetGenerator,
    mounter: Arc<dyn MediaMounter>,
    completion: Arc<dyn CompletionWaiter>,
    install_timeout: Duration,
    metrics: ProvisionMetrics,
}

impl Provisioner {
    pub fn new(
        generator: AssetGenerator,
        mounter: Arc<dyn MediaMounter>,
        completion: Arc<dyn CompletionWaiter>,
        install_timeout: Duration,
        metrics: ProvisionMetrics,
    ) -> Self {
        Self {
            generator,
            mounter,
            completion,
            install_timeout,
            metrics,
        }
    }

    pub fn metrics(&self) -> &ProvisionMetrics {
        &self.metrics
    }

    pub async fn provision(&self, spec: &ClusterSpec) -> Result<ProvisionOutcome> {
        let attempt = Uuid::new_v4();
        let span = info_span!("provision", attempt = %attempt, cluster = %spec.cluster_name);

        let result = self.attempt(spec).instrument(span).await;
        let outcome = match &result {
            Ok(_) => OUTCOME_SUCCESS,
            Err(e) if e.is_indeterminate() => OUTCOME_TIMEOUT,
            Err(_) => OUTCOME_FAILURE,
        };
        self.metrics.attempts_total.with_label_values(&[outcome]).inc();
        result
    }

    async fn attempt(&self, spec: &ClusterSpec) -> Result<ProvisionOutcome> {
        validate(spec)?;
        info!(
            control_plane = spec.control_plane_replicas,
            compute = spec.compute_replicas,
            hosts = spec.bmc.len(),
            "Cluster spec validated"
        );

        let workdir = WorkDir::prepare(spec.workdir.as_deref())?;
        let assets = match self.generator.generate(spec, &workdir).await {
            Ok(assets) => {
                self.metrics.image_builds_total.with_label_values(&[OUTCOME_SUCCESS]).inc();
                assets
            }
            Err(e) => {
                self.metrics.image_builds_total.with_label_values(&[OUTCOME_FAILURE]).inc();
                error!(error = %e, "Asset generation failed");
                return Err(e);
            }
        };

        let mounts = self.mount_hosts(&spec.bmc, &assets).await?;

        let mut waiter = InstallWaiter::new(self.completion.clone(), self.install_timeout);
        let started = Instant::now();
        let waited = waiter.wait(&workdir).await;
        let outcome = match &waited {
            Ok(_) => OUTCOME_SUCCESS,
            Err(e) if e.is_indeterminate() => OUTCOME_TIMEOUT,
            Err(_) => OUTCOME_FAILURE,
        };
        self.metrics
            .install_wait_seconds
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());

        Ok(ProvisionOutcome {
            assets,
            mounts,
            credentials: waited?,
        })
    }

    async fn mount_hosts(&self, hosts: &[BmcHost], assets: &GeneratedAssets) -> Result<Vec<MountReport>> {
        if hosts.is_empty() {
            info!(iso = %assets.iso_path.display(), "No managed hosts, boot media is attached manually");
            return Ok(Vec::new());
        }

        info!(hosts = hosts.len(), "Mounting boot image on managed hosts");
        let mounts = hosts.iter().map(|host| async move {
            let image_url = host
                .iso_url
                .as_deref()
                .or(assets.iso_url.as_deref())
                .ok_or_else(|| {
                    ProvisionError::media_mount(host.display_name(), "no boot image URL available")
                })?;
            self.mounter.mount(host, image_url).await
        });

        let mut reports = Vec::with_capacity(hosts.len());
        let mut first_failure = None;
        for (host, result) in hosts.iter().zip(join_all(mounts).await) {
            match result {
                Ok(report) => {
                    self.metrics.media_mounts_total.with_label_values(&[OUTCOME_SUCCESS]).inc();
                    reports.push(report);
                }
                Err(e) => {
                    self.metrics.media_mounts_total.with_label_values(&[OUTCOME_FAILURE]).inc();
                    error!(host = %host.display_name(), error = %e, "Virtual media mount failed");
                    first_failure.get_or_insert(e);
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}
