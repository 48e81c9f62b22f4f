use crate::error::ProbeError;
use crate::probes::round2;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;
use sysinfo::{NetworkExt, NetworksExt, System, SystemExt};

/// Supplies cumulative (rx, tx) byte counters. Injectable so tests can feed
/// deterministic counter sequences.
pub trait CounterSource: Send {
    fn cumulative_bytes(&mut self) -> Result<(u64, u64), ProbeError>;
}

pub struct SysinfoCounters {
    system: System,
}

impl SysinfoCounters {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_networks_list();
        Self { system }
    }
}

impl Default for SysinfoCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SysinfoCounters {
    fn cumulative_bytes(&mut self) -> Result<(u64, u64), ProbeError> {
        self.system.refresh_networks_list();
        self.system.refresh_networks();
        let mut rx = 0_u64;
        let mut tx = 0_u64;
        for (_iface, data) in self.system.networks().iter() {
            rx = rx.saturating_add(data.total_received());
            tx = tx.saturating_add(data.total_transmitted());
        }
        Ok((rx, tx))
    }
}

/// A cumulative total since boot/interface reset converted to Mbps-equivalent
/// units. This is NOT an instantaneous rate: callers wanting throughput must
/// take two samples and delta over wall-clock time. The value is
/// nondecreasing across samples unless the OS counters themselves reset.
#[derive(Debug, Clone, Serialize)]
pub struct BandwidthSample {
    pub current_usage: f64,
    pub timestamp: DateTime<Utc>,
}

pub struct BandwidthSampler {
    source: Mutex<Box<dyn CounterSource>>,
}

impl BandwidthSampler {
    pub fn new() -> Self {
        Self::with_source(Box::new(SysinfoCounters::new()))
    }

    pub fn with_source(source: Box<dyn CounterSource>) -> Self {
        Self {
            source: Mutex::new(source),
        }
    }

    pub fn sample(&self) -> Result<BandwidthSample, ProbeError> {
        let (rx, tx) = self
            .source
            .lock()
            .map_err(|_| ProbeError::Probe("network counter source unavailable".to_string()))?
            .cumulative_bytes()?;

        let total_bits = rx.saturating_add(tx) as f64 * 8.0;
        Ok(BandwidthSample {
            current_usage: round2(total_bits / 1_000_000.0),
            timestamp: Utc::now(),
        })
    }
}

impl Default for BandwidthSampler {
    fn default() -> Self {
        Self::new()
    }
}
