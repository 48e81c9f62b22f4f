use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub listen: String,
    #[serde(default = "default_roster")]
    pub roster: Vec<String>,
    #[serde(default)]
    pub ping: PingConfig,
    #[serde(default)]
    pub speedtest: SpeedTestConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PingConfig {
    #[serde(default = "default_ping_count")]
    pub count: u32,
    #[serde(default = "default_ping_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeedTestConfig {
    #[serde(default = "default_speedtest_base_url")]
    pub base_url: String,
    #[serde(default = "default_download_bytes")]
    pub download_bytes: usize,
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: usize,
    #[serde(default = "default_latency_timeout_secs")]
    pub latency_timeout_secs: u64,
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub email: String,
    /// Hex-encoded SHA-256 of the account password.
    pub password_sha256: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_api_key_env")]
    pub api_key_env: String,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            count: default_ping_count(),
            timeout_secs: default_ping_timeout_secs(),
        }
    }
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            base_url: default_speedtest_base_url(),
            download_bytes: default_download_bytes(),
            upload_bytes: default_upload_bytes(),
            latency_timeout_secs: default_latency_timeout_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            api_key_env: default_ai_api_key_env(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "listen field is required".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "listen must be a valid host:port address".to_string(),
            ));
        }

        validate_roster(&self.roster)?;
        validate_ping(&self.ping)?;
        validate_speedtest(&self.speedtest)?;
        validate_auth(&self.auth)?;

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_roster(roster: &[String]) -> Result<(), ConfigError> {
    if roster.is_empty() {
        return Err(ConfigError::Validation(
            "roster must contain at least one service".to_string(),
        ));
    }
    let mut names = HashSet::new();
    for service in roster {
        if service.trim().is_empty() {
            return Err(ConfigError::Validation(
                "roster entries must not be empty".to_string(),
            ));
        }
        if !names.insert(service.clone()) {
            return Err(ConfigError::Validation(format!(
                "roster entry '{}' must be unique",
                service
            )));
        }
    }
    Ok(())
}

fn validate_ping(cfg: &PingConfig) -> Result<(), ConfigError> {
    if cfg.count == 0 {
        return Err(ConfigError::Validation(
            "ping.count must be >= 1".to_string(),
        ));
    }
    if cfg.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "ping.timeout_secs must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_speedtest(cfg: &SpeedTestConfig) -> Result<(), ConfigError> {
    if cfg.base_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "speedtest.base_url must not be empty".to_string(),
        ));
    }
    if cfg.download_bytes == 0 || cfg.upload_bytes == 0 {
        return Err(ConfigError::Validation(
            "speedtest transfer sizes must be > 0".to_string(),
        ));
    }
    if cfg.latency_timeout_secs == 0 || cfg.transfer_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "speedtest timeouts must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_auth(cfg: &AuthConfig) -> Result<(), ConfigError> {
    if cfg.email.trim().is_empty() {
        return Err(ConfigError::Validation(
            "auth.email must not be empty".to_string(),
        ));
    }
    if cfg.password_sha256.len() != 64 || !cfg.password_sha256.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(ConfigError::Validation(
            "auth.password_sha256 must be a 64-char hex SHA-256 digest".to_string(),
        ));
    }
    if cfg.token_ttl_secs < 60 {
        return Err(ConfigError::Validation(
            "auth.token_ttl_secs must be >= 60".to_string(),
        ));
    }
    Ok(())
}

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

const fn default_ping_count() -> u32 {
    4
}

const fn default_ping_timeout_secs() -> u64 {
    30
}

fn default_speedtest_base_url() -> String {
    "https://speed.cloudflare.com".to_string()
}

const fn default_download_bytes() -> usize {
    10_000_000
}

const fn default_upload_bytes() -> usize {
    2_000_000
}

const fn default_latency_timeout_secs() -> u64 {
    6
}

const fn default_transfer_timeout_secs() -> u64 {
    20
}

const fn default_token_ttl_secs() -> u64 {
    3600
}

fn default_ai_base_url() -> String {
    "https://api.aimlapi.com/v1".to_string()
}

fn default_ai_model() -> String {
    "mistralai/Mistral-7B-Instruct-v0.2".to_string()
}

fn default_ai_api_key_env() -> String {
    "AI_ML_API_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            listen: "127.0.0.1:8870".to_string(),
            roster: default_roster(),
            ping: PingConfig::default(),
            speedtest: SpeedTestConfig::default(),
            auth: AuthConfig {
                email: "admin@example.com".to_string(),
                password_sha256:
                    "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8".to_string(),
                token_ttl_secs: 3600,
            },
            ai: AiConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        valid_config().validate().expect("default config is valid");
    }

    #[test]
    fn empty_roster_is_rejected() {
        let mut cfg = valid_config();
        cfg.roster.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_roster_entry_is_rejected() {
        let mut cfg = valid_config();
        cfg.roster.push("Main Router".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_password_digest_is_rejected() {
        let mut cfg = valid_config();
        cfg.auth.password_sha256 = "not-a-digest".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_ping_count_is_rejected() {
        let mut cfg = valid_config();
        cfg.ping.count = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg: Config =
            serde_yaml::from_str(Config::example_yaml()).expect("example YAML parses");
        cfg.validate().expect("example YAML validates");
    }
}
