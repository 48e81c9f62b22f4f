pub mod bandwidth;
pub mod ping;
pub mod speedtest;
pub mod status;

use crate::config::Config;
use bandwidth::BandwidthSampler;
use ping::ReachabilityProber;
use speedtest::SpeedTestRunner;
use status::StatusGenerator;

/// The full probe set, constructed once at process start. Probes keep no
/// call-to-call state, so one instance serves concurrent requests.
pub struct Probes {
    pub ping: ReachabilityProber,
    pub bandwidth: BandwidthSampler,
    pub speedtest: SpeedTestRunner,
    pub status: StatusGenerator,
}

impl Probes {
    pub fn from_config(cfg: &Config, client: reqwest::Client) -> Self {
        Self {
            ping: ReachabilityProber::new(&cfg.ping),
            bandwidth: BandwidthSampler::new(),
            speedtest: SpeedTestRunner::new(client, &cfg.speedtest),
            status: StatusGenerator::new(cfg.roster.clone()),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
