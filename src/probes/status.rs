use crate::probes::round2;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceSample {
    pub service: String,
    pub latency: f64,
    pub packet_loss: f64,
    pub status: ServiceStatus,
    pub timestamp: DateTime<Utc>,
}

/// Placeholder for a real monitoring backend: per roster entry it draws
/// latency from [5,100] ms, packet loss from [0,5] % and marks the service
/// Down with probability 0.10, independently per service per call. Consumers
/// depend on the output shape, not on the distribution, so real probes can
/// replace the draws later.
pub struct StatusGenerator {
    roster: Vec<String>,
}

impl StatusGenerator {
    pub fn new(roster: Vec<String>) -> Self {
        Self { roster }
    }

    /// One fresh cross-sectional sample per roster entry. No history, no
    /// smoothing, nothing persisted.
    pub fn generate(&self) -> Vec<ServiceSample> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        self.roster
            .iter()
            .map(|service| ServiceSample {
                service: service.clone(),
                latency: round2(rng.gen_range(5.0..=100.0)),
                packet_loss: round2(rng.gen_range(0.0..=5.0)),
                status: if rng.gen_bool(0.10) {
                    ServiceStatus::Down
                } else {
                    ServiceStatus::Up
                },
                timestamp: now,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn default_roster() -> Vec<String> {
        [
            "Main Router",
            "DNS Server",
            "Web Server",
            "Database Server",
            "Email Server",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn one_sample_per_roster_entry() {
        let roster = default_roster();
        let generator = StatusGenerator::new(roster.clone());
        let samples = generator.generate();
        assert_eq!(samples.len(), 5);

        let produced: HashSet<&str> = samples.iter().map(|s| s.service.as_str()).collect();
        let expected: HashSet<&str> = roster.iter().map(|s| s.as_str()).collect();
        assert_eq!(produced, expected);
    }

    #[test]
    fn samples_stay_within_contract_ranges() {
        let generator = StatusGenerator::new(default_roster());
        for _ in 0..50 {
            for sample in generator.generate() {
                assert!((5.0..=100.0).contains(&sample.latency), "{}", sample.latency);
                assert!(
                    (0.0..=5.0).contains(&sample.packet_loss),
                    "{}",
                    sample.packet_loss
                );
                assert!(matches!(
                    sample.status,
                    ServiceStatus::Up | ServiceStatus::Down
                ));
            }
        }
    }

    #[test]
    fn serializes_with_expected_keys() {
        let generator = StatusGenerator::new(default_roster());
        let json = serde_json::to_value(generator.generate()).expect("serializes");
        let first = &json[0];
        for key in ["service", "latency", "packet_loss", "status", "timestamp"] {
            assert!(first.get(key).is_some(), "missing key {key}");
        }
    }
}
