use crate::config::SpeedTestConfig;
use crate::error::ProbeError;
use crate::probes::round2;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// Download, upload and round-trip latency measured against the configured
/// exchange endpoint. All three fields are populated together or the whole
/// run fails; a partial result never escapes this module.
#[derive(Debug, Clone, Serialize)]
pub struct SpeedTestResult {
    pub download_speed: f64,
    pub upload_speed: f64,
    pub ping: f64,
    pub timestamp: DateTime<Utc>,
}

pub struct SpeedTestRunner {
    client: Client,
    base_url: String,
    download_bytes: usize,
    upload_bytes: usize,
    latency_timeout: Duration,
    transfer_timeout: Duration,
}

impl SpeedTestRunner {
    pub fn new(client: Client, cfg: &SpeedTestConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            download_bytes: cfg.download_bytes,
            upload_bytes: cfg.upload_bytes,
            latency_timeout: Duration::from_secs(cfg.latency_timeout_secs),
            transfer_timeout: Duration::from_secs(cfg.transfer_timeout_secs),
        }
    }

    /// Runs the three-phase exchange: HEAD for latency, sized GET for
    /// download, sized POST for upload. Long-running (seconds); keeps no
    /// state across calls.
    pub async fn run(&self) -> Result<SpeedTestResult, ProbeError> {
        let ping_start = Instant::now();
        self.client
            .head(format!("{}/", self.base_url))
            .timeout(self.latency_timeout)
            .send()
            .await?
            .error_for_status()?;
        let ping_ms = ping_start.elapsed().as_secs_f64() * 1000.0;

        let down_url = format!("{}/__down?bytes={}", self.base_url, self.download_bytes);
        let down_start = Instant::now();
        let down = self
            .client
            .get(down_url)
            .timeout(self.transfer_timeout)
            .send()
            .await?
            .error_for_status()?;
        let down_body = down.bytes().await?;
        let down_secs = down_start.elapsed().as_secs_f64().max(0.001);
        let download_mbps = (down_body.len() as f64 * 8.0 / 1_000_000.0) / down_secs;

        let upload_buf = vec![0_u8; self.upload_bytes];
        let up_start = Instant::now();
        self.client
            .post(format!("{}/__up", self.base_url))
            .timeout(self.transfer_timeout)
            .body(upload_buf)
            .send()
            .await?
            .error_for_status()?;
        let up_secs = up_start.elapsed().as_secs_f64().max(0.001);
        let upload_mbps = (self.upload_bytes as f64 * 8.0 / 1_000_000.0) / up_secs;

        debug!(
            download_mbps,
            upload_mbps, ping_ms, "speed test exchange complete"
        );

        Ok(SpeedTestResult {
            download_speed: round2(download_mbps),
            upload_speed: round2(upload_mbps),
            ping: round2(ping_ms),
            timestamp: Utc::now(),
        })
    }
}
