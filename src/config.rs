use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::constants;
use crate::domain::TelemetryKind;
use crate::error::ConfigError;

/// TLS trust settings for one HTTP client.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TlsConfig {
    /// Skip server certificate verification. Off unless explicitly enabled.
    pub insecure_skip_verify: bool,
    /// Extra PEM-encoded root certificate(s) to trust.
    pub ca_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub shard_id: String,
    pub tls: TlsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_URL.to_string(),
            shard_id: constants::DEFAULT_RLP_GATEWAY_SHARD_ID.to_string(),
            tls: TlsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UaaConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub tls: TlsConfig,
    pub request_timeout_secs: u64,
    pub refresh_skew_secs: u64,
}

impl Default for UaaConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_URL.to_string(),
            username: constants::DEFAULT_UAA_USERNAME.to_string(),
            password: String::new(),
            tls: TlsConfig::default(),
            request_timeout_secs: 30,
            refresh_skew_secs: 30,
        }
    }
}

impl UaaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_skew(&self) -> Duration {
        Duration::from_secs(self.refresh_skew_secs)
    }
}

/// Upper bound accepted for `reconnect.multiplier`.
pub const MAX_RECONNECT_MULTIPLIER: f64 = 10.0;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Telemetry kinds to run a receiver for.
    pub telemetry: Vec<TelemetryKind>,
    pub rlp_gateway: GatewayConfig,
    pub uaa: UaaConfig,
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telemetry: vec![TelemetryKind::Logs, TelemetryKind::Metrics],
            rlp_gateway: GatewayConfig::default(),
            uaa: UaaConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Config {
    /// Read a TOML file, then apply environment overrides. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::Invalid(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        debug!(path = %path.display(), kinds = ?config.telemetry, "configuration loaded");
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(constants::ENV_UAA_PASSWORD) {
            self.uaa.password = password;
        }
        if let Ok(endpoint) = std::env::var(constants::ENV_RLP_ENDPOINT) {
            self.rlp_gateway.endpoint = endpoint;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("rlp_gateway.endpoint", &self.rlp_gateway.endpoint)?;
        validate_endpoint("uaa.endpoint", &self.uaa.endpoint)?;

        if self.rlp_gateway.shard_id.trim().is_empty() {
            return Err(ConfigError::Invalid("rlp_gateway.shard_id cannot be empty".into()));
        }
        if self.uaa.username.is_empty() {
            return Err(ConfigError::Invalid("uaa.username not specified".into()));
        }
        if self.uaa.password.is_empty() {
            return Err(ConfigError::Invalid("uaa.password not specified".into()));
        }
        if self.telemetry.is_empty() {
            return Err(ConfigError::Invalid("at least one telemetry kind must be enabled".into()));
        }

        let reconnect = &self.reconnect;
        if reconnect.initial_delay_ms == 0 || reconnect.max_delay_ms < reconnect.initial_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "reconnect delays must satisfy 0 < initial_delay_ms <= max_delay_ms (got {} / {})",
                reconnect.initial_delay_ms, reconnect.max_delay_ms
            )));
        }
        if !(1.0..=MAX_RECONNECT_MULTIPLIER).contains(&reconnect.multiplier) {
            return Err(ConfigError::Invalid(format!(
                "reconnect.multiplier must be between 1.0 and {} (got {})",
                MAX_RECONNECT_MULTIPLIER,
                reconnect.multiplier
            )));
        }
        Ok(())
    }
}

fn validate_endpoint(field: &str, endpoint: &str) -> Result<(), ConfigError> {
    if endpoint.is_empty() {
        return Err(ConfigError::Invalid(format!("{} not specified", field)));
    }
    let parsed = reqwest::Url::parse(endpoint)
        .map_err(|e| ConfigError::Invalid(format!("failed to parse {} as url: {}", field, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{} must use http or https, got '{}'",
            field, other
        ))),
    }
}
