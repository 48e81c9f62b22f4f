use crate::probes::bandwidth::BandwidthSample;
use crate::probes::speedtest::SpeedTestResult;
use crate::probes::status::ServiceSample;
use crate::probes::Probes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Which sections a snapshot should cover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub status: bool,
    pub bandwidth: bool,
    pub speedtest: bool,
}

impl SnapshotRequest {
    /// Default coverage: the cheap sections. The speed test takes seconds
    /// and must be asked for explicitly.
    pub fn cheap() -> Self {
        Self {
            status: true,
            bandwidth: true,
            speedtest: false,
        }
    }
}

/// Per-section outcome: payload, or an error marker that leaves the other
/// sections untouched.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Section<T> {
    Ready(T),
    Failed { error: String },
}

#[derive(Debug, Serialize)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Section<Vec<ServiceSample>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<Section<BandwidthSample>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speedtest: Option<Section<SpeedTestResult>>,
    pub generated_at: DateTime<Utc>,
}

/// Runs the requested sub-probes concurrently and assembles one response.
/// The probes share no state and have no data dependency, so they are
/// joined rather than sequenced; a failure in one section is recorded as its
/// marker and never aborts the others. Retries belong to the caller.
pub async fn build_snapshot(probes: &Probes, include: SnapshotRequest) -> Snapshot {
    let status_fut = async {
        if include.status {
            Some(Section::Ready(probes.status.generate()))
        } else {
            None
        }
    };

    let bandwidth_fut = async {
        if include.bandwidth {
            Some(match probes.bandwidth.sample() {
                Ok(sample) => Section::Ready(sample),
                Err(err) => {
                    warn!(error = %err, "bandwidth section failed");
                    Section::Failed {
                        error: err.to_string(),
                    }
                }
            })
        } else {
            None
        }
    };

    let speedtest_fut = async {
        if include.speedtest {
            Some(match probes.speedtest.run().await {
                Ok(result) => Section::Ready(result),
                Err(err) => {
                    warn!(error = %err, "speedtest section failed");
                    Section::Failed {
                        error: err.to_string(),
                    }
                }
            })
        } else {
            None
        }
    };

    let (status, bandwidth, speedtest) = tokio::join!(status_fut, bandwidth_fut, speedtest_fut);

    Snapshot {
        status,
        bandwidth,
        speedtest,
        generated_at: Utc::now(),
    }
}
