use crate::probes::bandwidth::BandwidthSample;
use crate::probes::speedtest::SpeedTestResult;
use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    started_at: Instant,
    pub probe_invocations_total: CounterVec,
    pub probe_errors_total: CounterVec,
    pub login_failures_total: Counter,
    pub scrape_count_total: Counter,
    pub uptime_seconds: Gauge,
    pub speedtest_download_mbps: Gauge,
    pub speedtest_upload_mbps: Gauge,
    pub speedtest_ping_ms: Gauge,
    pub bandwidth_cumulative_mbits: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let probe_invocations_total = CounterVec::new(
            opts!(
                "netprobed_probe_invocations_total",
                "Probe invocations by probe name"
            ),
            &["probe"],
        )?;
        let probe_errors_total = CounterVec::new(
            opts!(
                "netprobed_probe_errors_total",
                "Probe failures by probe name"
            ),
            &["probe"],
        )?;
        let login_failures_total = Counter::with_opts(opts!(
            "netprobed_login_failures_total",
            "Rejected login attempts"
        ))?;
        let scrape_count_total = Counter::with_opts(opts!(
            "netprobed_scrape_count_total",
            "Number of /metrics scrapes"
        ))?;
        let uptime_seconds = Gauge::with_opts(opts!(
            "netprobed_uptime_seconds",
            "Process uptime in seconds"
        ))?;
        let speedtest_download_mbps = Gauge::with_opts(opts!(
            "netprobed_speedtest_download_mbps",
            "Last successful speed test download in Mbps"
        ))?;
        let speedtest_upload_mbps = Gauge::with_opts(opts!(
            "netprobed_speedtest_upload_mbps",
            "Last successful speed test upload in Mbps"
        ))?;
        let speedtest_ping_ms = Gauge::with_opts(opts!(
            "netprobed_speedtest_ping_ms",
            "Last successful speed test round-trip latency in ms"
        ))?;
        let bandwidth_cumulative_mbits = Gauge::with_opts(opts!(
            "netprobed_bandwidth_cumulative_mbits",
            "Last sampled cumulative interface counters in Mbit-equivalent units"
        ))?;

        register(&registry, &probe_invocations_total)?;
        register(&registry, &probe_errors_total)?;
        register(&registry, &login_failures_total)?;
        register(&registry, &scrape_count_total)?;
        register(&registry, &uptime_seconds)?;
        register(&registry, &speedtest_download_mbps)?;
        register(&registry, &speedtest_upload_mbps)?;
        register(&registry, &speedtest_ping_ms)?;
        register(&registry, &bandwidth_cumulative_mbits)?;

        Ok(Arc::new(Self {
            registry,
            started_at: Instant::now(),
            probe_invocations_total,
            probe_errors_total,
            login_failures_total,
            scrape_count_total,
            uptime_seconds,
            speedtest_download_mbps,
            speedtest_upload_mbps,
            speedtest_ping_ms,
            bandwidth_cumulative_mbits,
        }))
    }

    pub fn inc_probe(&self, probe: &str) {
        self.probe_invocations_total
            .with_label_values(&[probe])
            .inc();
    }

    pub fn inc_probe_error(&self, probe: &str) {
        self.probe_errors_total.with_label_values(&[probe]).inc();
    }

    pub fn inc_login_failure(&self) {
        self.login_failures_total.inc();
    }

    pub fn inc_scrape_count(&self) {
        self.scrape_count_total.inc();
    }

    pub fn record_speedtest(&self, result: &SpeedTestResult) {
        self.speedtest_download_mbps.set(result.download_speed);
        self.speedtest_upload_mbps.set(result.upload_speed);
        self.speedtest_ping_ms.set(result.ping);
    }

    pub fn record_bandwidth(&self, sample: &BandwidthSample) {
        self.bandwidth_cumulative_mbits.set(sample.current_usage);
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        self.uptime_seconds
            .set(self.started_at.elapsed().as_secs_f64());
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}
