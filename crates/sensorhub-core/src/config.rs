use std::net::{AddrParseError, IpAddr, SocketAddr};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SensorHubError};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_CONFIG_PATH: &str = "sensorhub.toml";
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 100;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_PRODUCER_INTERVAL_MS: u64 = 100;
pub const DEFAULT_PRODUCER_PERIOD_SECS: f64 = 10.0;
pub const DEFAULT_SENSOR_ID: &str = "sensor-0";

/// Top-level config (sensorhub.toml + SENSORHUB_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SensorHubConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_PORT,
        }
    }
}

/// Per-connection streaming behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Bounded queue size handed to each subscriber.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Batch cadence: one outbound message per interval.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Ping cadence, independent of data messages.
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
    /// Longest a single frame write may take before the consumer is dropped.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default)]
    pub wire_format: WireFormat,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            keepalive_interval_ms: DEFAULT_KEEPALIVE_INTERVAL_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            wire_format: WireFormat::default(),
        }
    }
}

/// Outbound batch encoding. Fixed for the lifetime of a deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WireFormat {
    /// Full batch as a JSON object with `Timestamp` and `Data`.
    #[default]
    Json,
    /// Only the point count: `NumberOfPoints="<N>"`.
    Count,
}

/// Built-in mock sensor publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_producer_interval_ms")]
    pub interval_ms: u64,
    /// Period of the generated sine wave.
    #[serde(default = "default_producer_period_secs")]
    pub period_secs: f64,
    #[serde(default = "default_sensor_id")]
    pub sensor_id: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_PRODUCER_INTERVAL_MS,
            period_secs: DEFAULT_PRODUCER_PERIOD_SECS,
            sensor_id: default_sensor_id(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}
fn default_keepalive_interval_ms() -> u64 {
    DEFAULT_KEEPALIVE_INTERVAL_MS
}
fn default_write_timeout_ms() -> u64 {
    DEFAULT_WRITE_TIMEOUT_MS
}
fn default_producer_interval_ms() -> u64 {
    DEFAULT_PRODUCER_INTERVAL_MS
}
fn default_producer_period_secs() -> f64 {
    DEFAULT_PRODUCER_PERIOD_SECS
}
fn default_sensor_id() -> String {
    DEFAULT_SENSOR_ID.to_string()
}

impl SensorHubConfig {
    /// Load config from a TOML file with SENSORHUB_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `SENSORHUB_STREAM__QUEUE_CAPACITY=250`. A missing file is not an error;
    /// built-in defaults fill every unset field.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let config: SensorHubConfig = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SENSORHUB_").split("__"))
            .extract()
            .map_err(|e| SensorHubError::Config(e.to_string()))?;

        config.validate()?;
        debug!(path, bind = %config.gateway.bind, port = config.gateway.port, "config loaded");
        Ok(config)
    }

    /// Reject values the streaming loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.stream.queue_capacity == 0 {
            return Err(SensorHubError::Config(
                "stream.queue_capacity must be at least 1".into(),
            ));
        }
        if self.stream.flush_interval_ms == 0 {
            return Err(SensorHubError::Config(
                "stream.flush_interval_ms must be greater than 0".into(),
            ));
        }
        if self.stream.keepalive_interval_ms == 0 {
            return Err(SensorHubError::Config(
                "stream.keepalive_interval_ms must be greater than 0".into(),
            ));
        }
        if self.stream.write_timeout_ms == 0 {
            return Err(SensorHubError::Config(
                "stream.write_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.producer.interval_ms == 0 {
            return Err(SensorHubError::Config(
                "producer.interval_ms must be greater than 0".into(),
            ));
        }
        if self.producer.period_secs.is_nan() || self.producer.period_secs <= 0.0 {
            return Err(SensorHubError::Config(
                "producer.period_secs must be positive".into(),
            ));
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Resolved `bind:port` socket address. `bind` must be an IP literal.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.gateway.bind.parse().map_err(|e: AddrParseError| {
            SensorHubError::InvalidAddress {
                addr: format!("{}:{}", self.gateway.bind, self.gateway.port),
                reason: e.to_string(),
            }
        })?;
        Ok(SocketAddr::new(ip, self.gateway.port))
    }

    /// Override bind + port from a `host:port` string (the `--addr` flag).
    pub fn set_listen_addr(&mut self, addr: &str) -> Result<()> {
        let parsed: SocketAddr = addr.parse().map_err(|e: AddrParseError| {
            SensorHubError::InvalidAddress {
                addr: addr.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.gateway.bind = parsed.ip().to_string();
        self.gateway.port = parsed.port();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let config = SensorHubConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stream.queue_capacity, 100);
        assert_eq!(config.stream.flush_interval_ms, 1_000);
        assert_eq!(config.stream.wire_format, WireFormat::Json);
        assert_eq!(config.listen_addr().unwrap().port(), DEFAULT_PORT);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = SensorHubConfig::load(Some("does-not-exist.toml"))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.gateway.port, DEFAULT_PORT);
            assert_eq!(config.producer.sensor_id, DEFAULT_SENSOR_ID);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sensorhub.toml",
                r#"
                [gateway]
                port = 9100

                [stream]
                queue_capacity = 5
                wire_format = "count"
                "#,
            )?;
            let config = SensorHubConfig::load(Some("sensorhub.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.gateway.port, 9100);
            assert_eq!(config.gateway.bind, DEFAULT_BIND);
            assert_eq!(config.stream.queue_capacity, 5);
            assert_eq!(config.stream.wire_format, WireFormat::Count);
            assert_eq!(config.stream.flush_interval_ms, DEFAULT_FLUSH_INTERVAL_MS);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("sensorhub.toml", "[stream]\nflush_interval_ms = 250\n")?;
            jail.set_env("SENSORHUB_STREAM__FLUSH_INTERVAL_MS", "500");
            jail.set_env("SENSORHUB_PRODUCER__SENSOR_ID", "bench-3");
            let config = SensorHubConfig::load(Some("sensorhub.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.stream.flush_interval_ms, 500);
            assert_eq!(config.producer.sensor_id, "bench-3");
            Ok(())
        });
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = SensorHubConfig::default();
        config.stream.queue_capacity = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn zero_keepalive_is_rejected() {
        let mut config = SensorHubConfig::default();
        config.stream.keepalive_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_write_timeout_is_rejected() {
        let mut config = SensorHubConfig::default();
        assert_eq!(config.stream.write_timeout_ms, 2_000);
        config.stream.write_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn hostname_bind_is_rejected() {
        let mut config = SensorHubConfig::default();
        config.gateway.bind = "localhost".into();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "INVALID_ADDRESS");
    }

    #[test]
    fn set_listen_addr_splits_host_and_port() {
        let mut config = SensorHubConfig::default();
        config.set_listen_addr("0.0.0.0:9002").unwrap();
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(config.gateway.port, 9002);
        assert!(config.set_listen_addr("not-an-addr").is_err());
    }

    #[test]
    fn ipv6_listen_addr_round_trips() {
        let mut config = SensorHubConfig::default();
        config.set_listen_addr("[::1]:7000").unwrap();
        assert_eq!(config.listen_addr().unwrap().to_string(), "[::1]:7000");
    }
}
