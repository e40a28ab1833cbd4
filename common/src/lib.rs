//! The climate node telemetry pipeline.
//!
//! Everything here is platform independent: the firmware and the host
//! simulator plug their hardware in through [`ports`] and the `embedded-hal`
//! traits, build a [`TelemetryNode`] and hand it to a [`Scheduler`].
//!
//! ```text
//! Scheduler ─▶ ConnectivityManager::ensure_link ─▶ SensorReader::read
//!           ─▶ Thresholds::classify ─▶ TimeSource::now
//!           ─▶ TelemetryPublisher::send ─▶ StatusIndicator::signal
//! ```

pub mod config;
pub mod connectivity;
pub mod dht;
pub mod indicator;
pub mod node;
pub mod ports;
pub mod publisher;
pub mod scheduler;
pub mod sensor;
pub mod time_source;

pub use config::{ConfigError, NodeConfig};
pub use connectivity::{ConnectivityManager, LinkContext, ReconnectPolicy};
pub use indicator::{BlinkPattern, StatusIndicator};
pub use node::{CycleReport, DeliveryStats, NodeParts, Pipeline, TelemetryNode};
pub use ports::{HttpResponse, HttpTransport, Hygrometer, Monotonic, Radio, TransportError, WallClock};
pub use publisher::TelemetryPublisher;
pub use scheduler::{IntervalTimer, Scheduler};
pub use sensor::{Acquisition, AcquisitionFault, Measurement, SensorReader};
pub use time_source::{ClockError, TimeSource};

pub use climate_node_model as model;
