//! Configuration
//!
//! Environment-variable configuration for the ingester. The streaming path
//! only uses the RPC URL, pair address and sidecar coordinates; the producer
//! tuning knobs are parsed and validated so misconfiguration fails fast.

use alloy::primitives::Address;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default pair to watch (WMATIC/USDC on Polygon).
pub const DEFAULT_PAIR_ADDRESS: &str = "0x6e7a5FAFcec6BB1e78bAE2A1F0B612012BF14827";

/// Errors produced while loading or validating configuration. All of them
/// abort startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("POLYGON_RPC_URL is required")]
    MissingRpcUrl,

    #[error("POLYGON_RPC_URL must use a streaming ws:// or wss:// scheme, got {0}")]
    NonStreamingRpcUrl(String),

    #[error("invalid PAIR_ADDRESS: {0}")]
    InvalidPairAddress(String),

    #[error("invalid duration {0:?} (expected forms like \"500ms\", \"5s\", \"1m\")")]
    InvalidDuration(String),

    #[error("PRODUCER_BATCH_SIZE must be positive")]
    NonPositiveBatchSize,

    #[error("APP_PORT is required")]
    MissingAppPort,

    #[error("invalid APP_PORT: {0}")]
    InvalidAppPort(String),
}

/// All application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Streaming JSON-RPC endpoint (ws:// or wss://)
    pub rpc_url: String,
    /// The liquidity pair contract to watch
    pub pair_address: Address,

    /// HTTP port of the local Dapr sidecar
    pub dapr_http_port: String,
    /// gRPC port of the sidecar (unused by the streaming path)
    pub dapr_grpc_port: String,
    /// Pub/sub component name
    pub pubsub_name: String,
    /// Topic swap events are published to
    pub topic_name: String,
    /// Schema registry endpoint (unused by the streaming path)
    pub schema_registry_url: String,

    /// Producer tuning, unused by the streaming path but validated
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub retry_max: u32,

    /// Port the health endpoint binds to
    pub app_port: u16,
    pub log_level: String,
    pub environment: String,
}

impl Config {
    /// Read configuration from the environment.
    ///
    /// # Errors
    /// Returns `ConfigError` for values that fail to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let pair_address_text = env_or("PAIR_ADDRESS", DEFAULT_PAIR_ADDRESS);
        let pair_address = pair_address_text
            .parse::<Address>()
            .map_err(|_| ConfigError::InvalidPairAddress(pair_address_text))?;

        let app_port_text = env_or("APP_PORT", "3000");
        let app_port = app_port_text
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidAppPort(app_port_text))?;

        Ok(Config {
            rpc_url: env_or("POLYGON_RPC_URL", "wss://polygon-bor-rpc.publicnode.com"),
            pair_address,
            dapr_http_port: env_or("DAPR_HTTP_PORT", "3500"),
            dapr_grpc_port: env_or("DAPR_GRPC_PORT", "50001"),
            pubsub_name: env_or("PUBSUB_NAME", "kafka-pubsub"),
            topic_name: env_or("TOPIC_DEX_EVENTS", "dex-events"),
            schema_registry_url: env_or("SCHEMA_REGISTRY_URL", "http://schema-registry:8081"),
            batch_size: env_or_parse("PRODUCER_BATCH_SIZE", 100),
            flush_interval: parse_duration(&env_or("PRODUCER_FLUSH_INTERVAL", "5s"))?,
            retry_max: env_or_parse("PRODUCER_RETRY_MAX", 3),
            app_port,
            log_level: env_or("LOG_LEVEL", "info"),
            environment: env_or("ENVIRONMENT", "development"),
        })
    }

    /// Check cross-field requirements not covered by parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.is_empty() {
            return Err(ConfigError::MissingRpcUrl);
        }
        if !self.rpc_url.starts_with("ws://") && !self.rpc_url.starts_with("wss://") {
            return Err(ConfigError::NonStreamingRpcUrl(self.rpc_url.clone()));
        }
        if self.pair_address == Address::ZERO {
            return Err(ConfigError::InvalidPairAddress("zero address".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::NonPositiveBatchSize);
        }
        if self.app_port == 0 {
            return Err(ConfigError::MissingAppPort);
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_or_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Parse a duration with a `ms`, `s` or `m` suffix.
pub fn parse_duration(text: &str) -> Result<Duration, ConfigError> {
    let trimmed = text.trim();
    let (digits, unit): (&str, fn(u64) -> Duration) = if let Some(rest) = trimmed.strip_suffix("ms")
    {
        (rest, Duration::from_millis)
    } else if let Some(rest) = trimmed.strip_suffix('s') {
        (rest, Duration::from_secs)
    } else if let Some(rest) = trimmed.strip_suffix('m') {
        (rest, |minutes| Duration::from_secs(minutes * 60))
    } else {
        return Err(ConfigError::InvalidDuration(text.to_string()));
    };

    digits
        .parse::<u64>()
        .map(unit)
        .map_err(|_| ConfigError::InvalidDuration(text.to_string()))
}
