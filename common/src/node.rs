//! One telemetry cycle: link, acquisition, classification, time, delivery,
//! signal.

use chrono::{DateTime, Utc};
use climate_node_model::{
    DeliveryOutcome, ErrorEvent, LinkState, Payload, PayloadKind, Reading, SeverityLabel,
    Thresholds,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::config::NodeConfig;
use crate::connectivity::{ConnectivityManager, LinkContext};
use crate::indicator::StatusIndicator;
use crate::ports::{Hygrometer, HttpTransport, Radio, WallClock};
use crate::publisher::TelemetryPublisher;
use crate::sensor::{Acquisition, SensorReader};
use crate::time_source::TimeSource;

/// What a [`crate::Scheduler`] drives.
pub trait Pipeline {
    fn run_cycle(&mut self) -> CycleReport;

    /// Cheap check between cycles; must not block on the network.
    fn watch_link(&mut self) -> LinkState;
}

/// Summary of one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub sequence: u64,
    pub link: LinkState,
    pub kind: PayloadKind,
    pub severity: Option<SeverityLabel>,
    /// `None` when the link was down and nothing was sent.
    pub delivery: Option<DeliveryOutcome>,
}

/// Running counters since boot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub cycles: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub transport_failures: u64,
    pub sensor_faults: u64,
    pub skipped: u64,
}

impl DeliveryStats {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        if report.kind == PayloadKind::Error {
            self.sensor_faults += 1;
        }
        match report.delivery {
            Some(DeliveryOutcome::Delivered) => self.delivered += 1,
            Some(DeliveryOutcome::ServerRejected) => self.rejected += 1,
            Some(DeliveryOutcome::TransportFailed) => self.transport_failures += 1,
            None => self.skipped += 1,
        }
    }
}

impl core::fmt::Display for DeliveryStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "cycles={} delivered={} rejected={} transport_failures={} sensor_faults={} skipped={}",
            self.cycles,
            self.delivered,
            self.rejected,
            self.transport_failures,
            self.sensor_faults,
            self.skipped
        )
    }
}

/// Hardware handed to a [`TelemetryNode`].
pub struct NodeParts<R, H, C, T, P, D> {
    pub radio: R,
    pub sensor: H,
    pub clock: C,
    pub transport: T,
    pub led: P,
    pub delay: D,
}

pub struct TelemetryNode<R, H, C, T, P, D> {
    device_id: String,
    thresholds: Thresholds,
    link: LinkContext,
    connectivity: ConnectivityManager<R, D>,
    sensor: SensorReader<H>,
    time: TimeSource<C>,
    publisher: TelemetryPublisher<T>,
    indicator: StatusIndicator<P, D>,
    sequence: u64,
    stats: DeliveryStats,
}

impl<R, H, C, T, P, D> TelemetryNode<R, H, C, T, P, D>
where
    R: Radio,
    H: Hygrometer,
    C: WallClock,
    T: HttpTransport,
    P: OutputPin,
    D: DelayNs + Clone,
{
    pub fn new(config: &NodeConfig, parts: NodeParts<R, H, C, T, P, D>) -> Self {
        Self {
            device_id: config.device_id.clone(),
            thresholds: config.thresholds,
            link: LinkContext::new(),
            connectivity: ConnectivityManager::new(
                parts.radio,
                parts.delay.clone(),
                config.reconnect,
            ),
            sensor: SensorReader::new(parts.sensor),
            time: TimeSource::new(parts.clock, config.time_sync_timeout()),
            publisher: TelemetryPublisher::new(
                parts.transport,
                config.endpoint.clone(),
                config.include_severity,
            ),
            indicator: StatusIndicator::new(parts.led, parts.delay),
            sequence: 0,
            stats: DeliveryStats::default(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    /// Brings the link up outside the cycle, e.g. once at boot.
    pub fn ensure_link(&mut self) -> LinkState {
        self.connectivity
            .ensure_link(&mut self.link, &mut self.indicator)
    }

    /// Current wall-clock time, if the link is up and the clock is synced.
    pub fn wall_time(&mut self) -> Option<DateTime<Utc>> {
        if self.link.is_up() {
            self.time.now()
        } else {
            None
        }
    }

    fn finish(&mut self, report: CycleReport) -> CycleReport {
        self.stats.record(&report);
        info!("Cycle {} done ({})", report.sequence, self.stats);
        report
    }
}

impl<R, H, C, T, P, D> Pipeline for TelemetryNode<R, H, C, T, P, D>
where
    R: Radio,
    H: Hygrometer,
    C: WallClock,
    T: HttpTransport,
    P: OutputPin,
    D: DelayNs + Clone,
{
    fn run_cycle(&mut self) -> CycleReport {
        self.sequence += 1;
        info!("--- Cycle {} ---", self.sequence);

        let link = self
            .connectivity
            .ensure_link(&mut self.link, &mut self.indicator);
        self.indicator.heartbeat(link);

        let sample = match self.sensor.read() {
            Acquisition::Valid(m) => {
                let severity = self.thresholds.classify(m.temperature, m.humidity);
                if severity.is_critical() || severity.is_alert() {
                    warn!("Severity: {severity}");
                } else {
                    info!("Severity: {severity}");
                }
                Ok((m, severity))
            }
            Acquisition::Invalid(fault) => Err(fault),
        };
        let kind = match sample {
            Ok(_) => PayloadKind::Reading,
            Err(_) => PayloadKind::Error,
        };
        let severity = sample.as_ref().ok().map(|(_, severity)| *severity);

        if !link.is_up() {
            warn!("Link down, nothing sent this cycle");
            return self.finish(CycleReport {
                sequence: self.sequence,
                link,
                kind,
                severity,
                delivery: None,
            });
        }

        let timestamp = self.time.now();
        if timestamp.is_none() {
            info!("No wall-clock time; the collector will use its receipt time");
        }

        let payload: Payload = match sample {
            Ok((m, status)) => Reading::new(
                m.temperature,
                m.humidity,
                timestamp,
                self.device_id.as_str(),
                status,
            )
            .into(),
            Err(fault) => {
                ErrorEvent::sensor_fault(fault.to_string(), self.device_id.as_str(), timestamp)
                    .into()
            }
        };
        let outcome = self.publisher.send(&payload);
        // The association may have dropped while the request was in flight.
        let settled = self
            .connectivity
            .refresh(&mut self.link, &mut self.indicator);
        self.indicator.signal(outcome, settled);
        info!("Delivery: {outcome}");

        self.finish(CycleReport {
            sequence: self.sequence,
            link,
            kind: payload.kind(),
            severity,
            delivery: Some(outcome),
        })
    }

    fn watch_link(&mut self) -> LinkState {
        self.connectivity.refresh(&mut self.link, &mut self.indicator)
    }
}
