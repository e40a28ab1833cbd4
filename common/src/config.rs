//! Boot-time configuration of a node.

use core::time::Duration;

use climate_node_model::Thresholds;
use serde::{Deserialize, Serialize};

use crate::connectivity::ReconnectPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("device id must not be empty")]
    EmptyDeviceId,
    #[error("collector endpoint `{0}` is not an http(s) URL")]
    InvalidEndpoint(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{0} bands must satisfy critical min < alert min <= alert max < critical max")]
    BandsNotNested(&'static str),
    #[error("`{key}` = `{value}` is not a number")]
    InvalidNumber { key: &'static str, value: String },
    #[error("malformed configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything the node needs to know before entering its loop.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    pub device_id: String,
    /// Collector URL the telemetry is posted to.
    pub endpoint: String,
    /// Time between two acquisition cycles.
    pub interval_ms: u32,
    /// How often the loop wakes up to check the interval and the link.
    pub poll_interval_ms: u32,
    pub http_timeout_ms: u32,
    pub time_sync_timeout_ms: u32,
    pub reconnect: ReconnectPolicy,
    pub thresholds: Thresholds,
    /// Adds the computed severity to reading payloads.
    pub include_severity: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_id: "ESP32_DHT11_Device_01".into(),
            endpoint: "http://127.0.0.1:5000/data".into(),
            interval_ms: 30_000,
            poll_interval_ms: 1_000,
            http_timeout_ms: 5_000,
            time_sync_timeout_ms: 5_000,
            reconnect: ReconnectPolicy::default(),
            thresholds: Thresholds::default(),
            include_severity: false,
        }
    }
}

impl NodeConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Applies overrides looked up by key.
    ///
    /// Threshold keys follow the collector's environment names
    /// (`TEMP_MIN_ALERTA`, `UMID_MAX_CRITICO`, ...) so one `.env` file can
    /// drive both sides.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device_id) = lookup("DEVICE_ID") {
            self.device_id = device_id;
        }
        if let Some(endpoint) = lookup("COLLECTOR_URL") {
            self.endpoint = endpoint;
        }
        if let Some(value) = lookup("READING_INTERVAL_MS") {
            self.interval_ms = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: "READING_INTERVAL_MS",
                    value,
                })?;
        }

        let t = &mut self.thresholds;
        let bounds: [(&'static str, &mut f32); 8] = [
            ("TEMP_MIN_ALERTA", &mut t.temperature.alert.min),
            ("TEMP_MAX_ALERTA", &mut t.temperature.alert.max),
            ("TEMP_MIN_CRITICO", &mut t.temperature.critical.min),
            ("TEMP_MAX_CRITICO", &mut t.temperature.critical.max),
            ("UMID_MIN_ALERTA", &mut t.humidity.alert.min),
            ("UMID_MAX_ALERTA", &mut t.humidity.alert.max),
            ("UMID_MIN_CRITICO", &mut t.humidity.critical.min),
            ("UMID_MAX_CRITICO", &mut t.humidity.critical.max),
        ];
        for (key, bound) in bounds {
            if let Some(value) = lookup(key) {
                *bound = value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { key, value })?;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceId);
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::Zero("interval_ms"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("poll_interval_ms"));
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::Zero("http_timeout_ms"));
        }
        if self.time_sync_timeout_ms == 0 {
            return Err(ConfigError::Zero("time_sync_timeout_ms"));
        }
        if self.reconnect.attempts == 0 {
            return Err(ConfigError::Zero("reconnect.attempts"));
        }
        if !self.thresholds.temperature.is_nested() {
            return Err(ConfigError::BandsNotNested("temperature"));
        }
        if !self.thresholds.humidity.is_nested() {
            return Err(ConfigError::BandsNotNested("humidity"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.into())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms.into())
    }

    pub fn time_sync_timeout(&self) -> Duration {
        Duration::from_millis(self.time_sync_timeout_ms.into())
    }
}
