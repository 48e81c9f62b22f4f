use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy for the probe layer.
///
/// `InvalidAddress` is a caller mistake and maps to 400; everything else is
/// an external-dependency failure and maps to 500. Failures are terminal for
/// the invocation: no retries, no substitution of cached or synthetic data.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Invalid IP address format")]
    InvalidAddress,
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Probe(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("speed test request failed: {0}")]
    SpeedTest(#[from] reqwest::Error),
}

impl ProbeError {
    /// True for errors caused by the caller's input rather than the probe's
    /// environment.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, ProbeError::InvalidAddress)
    }
}
