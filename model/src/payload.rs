use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::severity::{SeverityLabel, Thresholds};

/// Wire format of every timestamp the node emits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn wire_timestamp<S: Serializer>(
    timestamp: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match timestamp {
        Some(timestamp) => serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT)),
        None => serializer.serialize_none(),
    }
}

/// One validated and classified acquisition.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    temperature: f32,
    humidity: f32,
    timestamp: Option<DateTime<Utc>>,
    device_id: String,
    status: SeverityLabel,
}

impl Reading {
    pub fn new(
        temperature: f32,
        humidity: f32,
        timestamp: Option<DateTime<Utc>>,
        device_id: impl Into<String>,
        status: SeverityLabel,
    ) -> Self {
        Self {
            temperature,
            humidity,
            timestamp,
            device_id: device_id.into(),
            status,
        }
    }

    /// Builds a reading whose status is computed from `thresholds`.
    pub fn classified(
        temperature: f32,
        humidity: f32,
        timestamp: Option<DateTime<Utc>>,
        device_id: impl Into<String>,
        thresholds: &Thresholds,
    ) -> Self {
        let status = thresholds.classify(temperature, humidity);
        Self::new(temperature, humidity, timestamp, device_id, status)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn status(&self) -> SeverityLabel {
        self.status
    }
}

#[derive(Serialize)]
struct ReadingWire<'a> {
    temperatura: f32,
    umidade: f32,
    device_id: &'a str,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire_timestamp"
    )]
    timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<SeverityLabel>,
}

/// The only status an error event can carry.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorStatus {
    #[serde(rename = "erro_sensor")]
    SensorFault,
}

/// Report of a failed acquisition.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ErrorEvent {
    status: ErrorStatus,
    message: String,
    device_id: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire_timestamp"
    )]
    timestamp: Option<DateTime<Utc>>,
}

impl ErrorEvent {
    pub fn sensor_fault(
        message: impl Into<String>,
        device_id: impl Into<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status: ErrorStatus::SensorFault,
            message: message.into(),
            device_id: device_id.into(),
            timestamp,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Reading,
    Error,
}

/// Everything the node can send to the collector.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Reading(Reading),
    Error(ErrorEvent),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Reading(_) => PayloadKind::Reading,
            Self::Error(_) => PayloadKind::Error,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Self::Reading(reading) => reading.device_id(),
            Self::Error(event) => event.device_id(),
        }
    }

    /// Encodes the payload as the collector's JSON body.
    ///
    /// `include_severity` adds the reading's `status` field; error events
    /// always carry theirs.
    pub fn to_json(&self, include_severity: bool) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Reading(reading) => serde_json::to_vec(&ReadingWire {
                temperatura: reading.temperature,
                umidade: reading.humidity,
                device_id: &reading.device_id,
                timestamp: reading.timestamp,
                status: include_severity.then_some(reading.status),
            }),
            Self::Error(event) => serde_json::to_vec(event),
        }
    }
}

impl From<Reading> for Payload {
    fn from(reading: Reading) -> Self {
        Self::Reading(reading)
    }
}

impl From<ErrorEvent> for Payload {
    fn from(event: ErrorEvent) -> Self {
        Self::Error(event)
    }
}
