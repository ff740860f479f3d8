#[cfg(feature = "prometheus")]
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
#[cfg(feature = "prometheus")]
use tracing::warn;

/// Control-plane activity metrics: gateway/listener/environment/deployment
/// counts, admin request counters, translate/publish latency, and the
/// per-node snapshot version — re-scoped from the data-plane request
/// counters the teacher's `MetricsCollector` tracks.
#[cfg(feature = "prometheus")]
pub struct MetricsCollector {
    registry: Registry,

    pub gateways_total: IntGaugeVec,
    pub listeners_total: IntGaugeVec,
    pub environments_total: IntGaugeVec,
    pub deployments_total: IntGaugeVec,
    pub admin_requests_total: IntCounterVec,
    pub translate_duration: HistogramVec,
    pub publish_duration: HistogramVec,
    pub snapshot_version: IntGaugeVec,
}

#[cfg(feature = "prometheus")]
impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let gateways_total = IntGaugeVec::new(
            Opts::new("flowc_gateways_total", "Total gateways").namespace("flowc"),
            &[],
        )?;
        let listeners_total = IntGaugeVec::new(
            Opts::new("flowc_listeners_total", "Total listeners").namespace("flowc"),
            &[],
        )?;
        let environments_total = IntGaugeVec::new(
            Opts::new("flowc_environments_total", "Total environments").namespace("flowc"),
            &[],
        )?;
        let deployments_total = IntGaugeVec::new(
            Opts::new("flowc_deployments_total", "Total deployments").namespace("flowc"),
            &["status"],
        )?;
        let admin_requests_total = IntCounterVec::new(
            Opts::new("flowc_admin_requests_total", "Total admin API requests").namespace("flowc"),
            &["method", "path", "status"],
        )?;
        let translate_duration = HistogramVec::new(
            HistogramOpts::new("flowc_translate_duration_seconds", "Translator latency")
                .namespace("flowc")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5]),
            &[],
        )?;
        let publish_duration = HistogramVec::new(
            HistogramOpts::new("flowc_publish_duration_seconds", "Snapshot publish latency")
                .namespace("flowc")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05]),
            &[],
        )?;
        let snapshot_version = IntGaugeVec::new(
            Opts::new("flowc_snapshot_version", "Current snapshot version per node").namespace("flowc"),
            &["node_id"],
        )?;

        registry.register(Box::new(gateways_total.clone()))?;
        registry.register(Box::new(listeners_total.clone()))?;
        registry.register(Box::new(environments_total.clone()))?;
        registry.register(Box::new(deployments_total.clone()))?;
        registry.register(Box::new(admin_requests_total.clone()))?;
        registry.register(Box::new(translate_duration.clone()))?;
        registry.register(Box::new(publish_duration.clone()))?;
        registry.register(Box::new(snapshot_version.clone()))?;

        Ok(Self {
            registry,
            gateways_total,
            listeners_total,
            environments_total,
            deployments_total,
            admin_requests_total,
            translate_duration,
            publish_duration,
            snapshot_version,
        })
    }

    pub fn record_admin_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.admin_requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        let _ = duration_secs;
    }

    pub fn record_translate(&self, duration_secs: f64) {
        self.translate_duration.with_label_values(&[]).observe(duration_secs);
    }

    pub fn record_publish(&self, duration_secs: f64) {
        self.publish_duration.with_label_values(&[]).observe(duration_secs);
    }

    pub fn set_snapshot_version(&self, node_id: &str, version: u64) {
        self.snapshot_version
            .with_label_values(&[node_id])
            .set(version as i64);
    }

    /// Prometheus text exposition for `GET /metrics`.
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metrics = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metrics, &mut buffer) {
            warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(feature = "prometheus")]
impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("failed to construct metrics registry")
    }
}
