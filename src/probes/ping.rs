use crate::config::PingConfig;
use crate::error::ProbeError;
use serde::Serialize;
use std::net::IpAddr;
use std::process::{Command, Output};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Spawns the platform ping binary. Injectable so tests can assert that
/// malformed addresses never reach a subprocess.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<Output>;
}

pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<Output> {
        Command::new(program).args(args).output()
    }
}

/// Raw ping output, verbatim. Round-trip times and loss percentages are left
/// for consumers to parse out of the text.
#[derive(Debug, Clone, Serialize)]
pub struct PingOutput {
    pub result: String,
}

pub struct ReachabilityProber {
    runner: Arc<dyn ProcessRunner>,
    default_count: u32,
    timeout: Duration,
}

impl ReachabilityProber {
    pub fn new(cfg: &PingConfig) -> Self {
        Self::with_runner(Arc::new(SystemRunner), cfg)
    }

    pub fn with_runner(runner: Arc<dyn ProcessRunner>, cfg: &PingConfig) -> Self {
        Self {
            runner,
            default_count: cfg.count,
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    /// Issues `count` ICMP echo requests to `address` and returns the raw
    /// ping output. The address must be an IPv4 or IPv6 literal; anything
    /// else is rejected before any process is spawned.
    pub async fn probe(&self, address: &str, count: Option<u32>) -> Result<PingOutput, ProbeError> {
        let target: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| ProbeError::InvalidAddress)?;
        let count = count.unwrap_or(self.default_count).max(1);
        let args = ping_args(target, count);

        let runner = Arc::clone(&self.runner);
        let wait = tokio::task::spawn_blocking(move || runner.run("ping", &args));
        // The deadline abandons the wait; the subprocess itself is bounded
        // by the echo count and exits on its own.
        let output = match tokio::time::timeout(self.timeout, wait).await {
            Err(_elapsed) => {
                warn!(target = %target, timeout = ?self.timeout, "ping deadline expired");
                return Err(ProbeError::Timeout(self.timeout));
            }
            Ok(Err(join_err)) => {
                return Err(ProbeError::Probe(format!("ping task failed: {join_err}")))
            }
            Ok(Ok(result)) => result?,
        };

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(target = %target, error = %stderr, "ping reported an error");
            return Err(ProbeError::Probe(stderr));
        }

        Ok(PingOutput {
            result: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

fn ping_args(target: IpAddr, count: u32) -> Vec<String> {
    // Count flag differs between Windows and POSIX ping.
    let count_flag = if cfg!(target_os = "windows") {
        "-n"
    } else {
        "-c"
    };
    vec![
        count_flag.to_string(),
        count.to_string(),
        target.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeRunner {
        invocations: AtomicUsize,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        last_args: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn new(stdout: &str, stderr: &str) -> Arc<Self> {
            Arc::new(Self {
                invocations: AtomicUsize::new(0),
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
                last_args: Mutex::new(Vec::new()),
            })
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, _program: &str, args: &[String]) -> std::io::Result<Output> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            *self.last_args.lock().unwrap() = args.to_vec();
            #[cfg(unix)]
            let status = {
                use std::os::unix::process::ExitStatusExt;
                std::process::ExitStatus::from_raw(0)
            };
            #[cfg(windows)]
            let status = {
                use std::os::windows::process::ExitStatusExt;
                std::process::ExitStatus::from_raw(0)
            };
            Ok(Output {
                status,
                stdout: self.stdout.clone(),
                stderr: self.stderr.clone(),
            })
        }
    }

    fn prober(runner: Arc<FakeRunner>) -> ReachabilityProber {
        ReachabilityProber::with_runner(runner, &PingConfig::default())
    }

    #[tokio::test]
    async fn invalid_addresses_never_spawn() {
        let runner = FakeRunner::new("", "");
        let prober = prober(runner.clone());
        for bad in ["999.999.999.999", "not-an-ip", "", "8.8.8.8; rm -rf /"] {
            let err = prober.probe(bad, None).await.expect_err("must reject");
            assert!(matches!(err, ProbeError::InvalidAddress), "input: {bad:?}");
        }
        assert_eq!(runner.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_addresses_reach_the_runner() {
        let runner = FakeRunner::new("4 packets transmitted, 4 received\n", "");
        let prober = prober(runner.clone());

        let out = prober.probe("8.8.8.8", Some(2)).await.expect("success");
        assert!(out.result.contains("4 packets transmitted"));

        prober.probe("::1", None).await.expect("v6 literal accepted");
        assert_eq!(runner.invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn count_is_passed_through() {
        let runner = FakeRunner::new("ok", "");
        let prober = prober(runner.clone());
        prober.probe("127.0.0.1", Some(7)).await.expect("success");
        let args = runner.last_args.lock().unwrap().clone();
        assert!(args.contains(&"7".to_string()));
        assert!(args.contains(&"127.0.0.1".to_string()));
    }

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout_error() {
        struct StalledRunner;

        impl ProcessRunner for StalledRunner {
            fn run(&self, _program: &str, _args: &[String]) -> std::io::Result<Output> {
                std::thread::sleep(Duration::from_secs(5));
                Err(std::io::Error::new(std::io::ErrorKind::Other, "unreached"))
            }
        }

        let prober = ReachabilityProber::with_runner(
            Arc::new(StalledRunner),
            &PingConfig {
                count: 4,
                timeout_secs: 1,
            },
        );
        let err = prober.probe("127.0.0.1", None).await.expect_err("must time out");
        assert!(matches!(err, ProbeError::Timeout(_)));
    }

    #[tokio::test]
    async fn stderr_output_becomes_probe_error() {
        let runner = FakeRunner::new("partial stdout", "ping: sendmsg: Network is unreachable");
        let prober = prober(runner);
        let err = prober.probe("10.0.0.1", None).await.expect_err("must fail");
        match err {
            ProbeError::Probe(msg) => assert!(msg.contains("Network is unreachable")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ping_args_use_platform_count_flag() {
        let args = ping_args("127.0.0.1".parse().unwrap(), 4);
        let expected_flag = if cfg!(target_os = "windows") { "-n" } else { "-c" };
        assert_eq!(args[0], expected_flag);
        assert_eq!(args[1], "4");
        assert_eq!(args[2], "127.0.0.1");
    }
}
