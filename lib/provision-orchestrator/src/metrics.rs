//! Prometheus metrics for provisioning attempts

use anyhow::Result;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Outcome label values
pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";
pub const OUTCOME_TIMEOUT: &str = "timeout";

#[derive(Clone)]
pub struct ProvisionMetrics {
    /// Provisioning attempts by outcome
    pub attempts_total: CounterVec,
    /// Boot image builds by outcome
    pub image_builds_total: CounterVec,
    /// Virtual media mounts by outcome
    pub media_mounts_total: CounterVec,
    /// Time spent waiting for install completion
    pub install_wait_seconds: HistogramVec,
    pub registry: Arc<Registry>,
}

impl ProvisionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let attempts_total = CounterVec::new(
            Opts::new("provision_attempts_total", "Provisioning attempts by outcome"),
            &["outcome"],
        )?;

        let image_builds_total = CounterVec::new(
            Opts::new("provision_image_builds_total", "Boot image builds by outcome"),
            &["outcome"],
        )?;

        let media_mounts_total = CounterVec::new(
            Opts::new("provision_media_mounts_total", "Virtual media mounts by outcome"),
            &["outcome"],
        )?;

        // Installs take tens of minutes
        let install_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "provision_install_wait_seconds",
                "Time spent waiting for install completion",
            )
            .buckets(vec![60.0, 300.0, 600.0, 1200.0, 1800.0, 2700.0, 3600.0, 5400.0, 7200.0]),
            &["outcome"],
        )?;

        registry.register(Box::new(attempts_total.clone()))?;
        registry.register(Box::new(image_builds_total.clone()))?;
        registry.register(Box::new(media_mounts_total.clone()))?;
        registry.register(Box::new(install_wait_seconds.clone()))?;

        Ok(Self {
            attempts_total,
            image_builds_total,
            media_mounts_total,
            install_wait_seconds,
            registry,
        })
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_text_format() {
        let metrics = ProvisionMetrics::new().unwrap();
        metrics
            .media_mounts_total
            .with_label_values(&[OUTCOME_SUCCESS])
            .inc_by(2.0);
        metrics
            .install_wait_seconds
            .with_label_values(&[OUTCOME_TIMEOUT])
            .observe(5400.0);

        let text = metrics.gather().unwrap();
        assert!(text.contains("provision_media_mounts_total{outcome=\"success\"} 2"));
        assert!(text.contains("provision_install_wait_seconds_count{outcome=\"timeout\"} 1"));
    }

    #[test]
    fn test_clones_share_registry() {
        let metrics = ProvisionMetrics::new().unwrap();
        let clone = metrics.clone();
        clone.attempts_total.with_label_values(&[OUTCOME_FAILURE]).inc();
        assert_eq!(
            metrics.attempts_total.with_label_values(&[OUTCOME_FAILURE]).get(),
            1.0
        );
    }
}
