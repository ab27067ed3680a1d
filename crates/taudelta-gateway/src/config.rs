//! Application configuration loaded from environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::store::InfluxConfig;

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080").
    pub bind_addr: String,

    /// InfluxDB URL.
    pub influxdb_url: String,

    /// InfluxDB API token.
    pub influxdb_token: String,

    /// InfluxDB organization.
    pub influxdb_org: String,

    /// InfluxDB bucket holding member/consumer data.
    pub influxdb_bucket: String,

    /// Timeout for each InfluxDB request.
    pub influxdb_timeout: Duration,

    /// Base URL of the sensors API receiving notifications (optional).
    pub sensors_api: Option<String>,

    /// Timeout for each notification request.
    pub notify_timeout: Duration,

    /// Members processed concurrently during discovery.
    pub discovery_concurrency: usize,

    /// Port for the Prometheus exporter (optional).
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `INFLUXDB_URL`, `INFLUXDB_TOKEN`, `INFLUXDB_ORG`, `INFLUXDB_BUCKET`
    ///
    /// Optional:
    /// - `GATEWAY_BIND_ADDR`: Server bind address (default: "0.0.0.0:8080")
    /// - `SENSORS_API`: Notification base URL (default: unset, forwarding disabled)
    /// - `INFLUXDB_TIMEOUT_SECS`: Store request timeout (default: 10)
    /// - `NOTIFY_TIMEOUT_SECS`: Notification request timeout (default: 5)
    /// - `DISCOVERY_CONCURRENCY`: Parallel members during discovery (default: 4)
    /// - `METRICS_PORT`: Prometheus exporter port (default: unset, disabled)
    pub fn from_env() -> anyhow::Result<Self> {
        let influxdb_url = required("INFLUXDB_URL")?;
        let influxdb_token = required("INFLUXDB_TOKEN")?;
        let influxdb_org = required("INFLUXDB_ORG")?;
        let influxdb_bucket = required("INFLUXDB_BUCKET")?;

        let bind_addr =
            std::env::var("GATEWAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let sensors_api = optional("SENSORS_API");

        let influxdb_timeout = Duration::from_secs(parsed("INFLUXDB_TIMEOUT_SECS", 10u64)?);
        let notify_timeout = Duration::from_secs(parsed("NOTIFY_TIMEOUT_SECS", 5u64)?);
        let discovery_concurrency = parsed("DISCOVERY_CONCURRENCY", 4usize)?.max(1);

        let metrics_port = optional("METRICS_PORT")
            .map(|p| {
                p.parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("METRICS_PORT is not a valid port: {e}"))
            })
            .transpose()?;

        let config = Self {
            bind_addr,
            influxdb_url,
            influxdb_token,
            influxdb_org,
            influxdb_bucket,
            influxdb_timeout,
            sensors_api,
            notify_timeout,
            discovery_concurrency,
            metrics_port,
        };

        tracing::info!(config = ?config, "configuration loaded");

        Ok(config)
    }

    /// Store connection settings.
    pub fn influx(&self) -> InfluxConfig {
        InfluxConfig {
            url: self.influxdb_url.clone(),
            token: self.influxdb_token.clone(),
            org: self.influxdb_org.clone(),
            bucket: self.influxdb_bucket.clone(),
            timeout: self.influxdb_timeout,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("influxdb_url", &self.influxdb_url)
            .field("influxdb_token", &"<redacted>")
            .field("influxdb_org", &self.influxdb_org)
            .field("influxdb_bucket", &self.influxdb_bucket)
            .field("influxdb_timeout", &self.influxdb_timeout)
            .field("sensors_api", &self.sensors_api)
            .field("notify_timeout", &self.notify_timeout)
            .field("discovery_concurrency", &self.discovery_concurrency)
            .field("metrics_port", &self.metrics_port)
            .finish()
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &str) -> anyhow::Result<String> {
    optional(name).ok_or_else(|| anyhow::anyhow!("{name} environment variable is required"))
}

fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} has invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}
