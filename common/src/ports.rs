//! Boundaries between the pipeline and the platform it runs on.
//!
//! LED pins and blocking delays use the `embedded-hal` traits directly. The
//! traits below cover what `embedded-hal` has no vocabulary for. Each platform
//! (ESP-IDF firmware, host simulator, test doubles) supplies its own adapters.

use core::fmt::Display;
use core::time::Duration;

use chrono::{DateTime, Utc};

/// The network interface the node associates with (Wi-Fi station, Ethernet).
pub trait Radio {
    type Error: Display;

    /// Whether the interface currently holds an association with an address.
    fn is_connected(&mut self) -> bool;

    /// One blocking association attempt. Completes within the driver's own
    /// timeout.
    fn connect(&mut self) -> Result<(), Self::Error>;
}

/// A combined temperature and relative humidity sensor.
pub trait Hygrometer {
    type Error: Display;

    /// Human readable part name, used in logs and error events.
    fn model(&self) -> &str;

    /// One acquisition: `(temperature_celsius, humidity_percent)`. Drivers
    /// that report failures as NaN may return `Ok` with NaN values.
    fn measure(&mut self) -> Result<(f32, f32), Self::Error>;
}

/// A network-synchronised wall clock.
pub trait WallClock {
    type Error: Display;

    /// Resolves the current UTC time, giving up after `timeout`.
    fn utc_now(&mut self, timeout: Duration) -> Result<DateTime<Utc>, Self::Error>;
}

/// A monotonic millisecond counter that wraps at `u32::MAX`.
pub trait Monotonic {
    fn now_ms(&self) -> u32;
}

/// Status line and body of an HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Failures that leave the node without any response from the collector.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not resolve {0}")]
    Dns(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("i/o error: {0}")]
    Io(String),
}

/// Blocking HTTP client used for telemetry delivery.
pub trait HttpTransport {
    /// Sends a single `POST` with a JSON body. Any response that arrives,
    /// whatever its status, is `Ok`.
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, TransportError>;
}
