//! Desktop stand-ins for the node's peripherals.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use climate_node_common::{Hygrometer, Monotonic, Radio, WallClock};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

/// A DHT22 replaying a smooth day/night curve, with optional injected faults.
pub struct SimulatedDht {
    samples: u64,
    fault_every: u32,
}

impl SimulatedDht {
    /// `fault_every = n` makes every n-th read come back as NaN; 0 disables it.
    pub fn new(fault_every: u32) -> Self {
        Self {
            samples: 0,
            fault_every,
        }
    }
}

impl Hygrometer for SimulatedDht {
    type Error = Infallible;

    fn model(&self) -> &str {
        "DHT22 (simulated)"
    }

    fn measure(&mut self) -> Result<(f32, f32), Infallible> {
        self.samples += 1;
        if self.fault_every > 0 && self.samples % u64::from(self.fault_every) == 0 {
            return Ok((f32::NAN, f32::NAN));
        }

        let phase = self.samples as f32 * 0.3;
        let temperature = 24.0 + 9.0 * phase.sin();
        let humidity = 60.0 + 28.0 * (phase * 0.7).cos();
        // Same 0.1 resolution as the real part.
        Ok((
            (temperature * 10.0).round() / 10.0,
            (humidity * 10.0).round() / 10.0,
        ))
    }
}

/// The host's own network; it is always associated.
pub struct HostNetwork;

impl Radio for HostNetwork {
    type Error = Infallible;

    fn is_connected(&mut self) -> bool {
        true
    }

    fn connect(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// The operating system clock, kept in sync by the host.
pub struct SystemClock;

impl WallClock for SystemClock {
    type Error = Infallible;

    fn utc_now(&mut self, _timeout: Duration) -> Result<DateTime<Utc>, Infallible> {
        Ok(Utc::now())
    }
}

/// Prints the LED level to the log instead of driving a pin.
pub struct ConsoleLed;

impl ErrorType for ConsoleLed {
    type Error = Infallible;
}

impl OutputPin for ConsoleLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        log::debug!("LED off");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        log::debug!("LED on");
        Ok(())
    }
}

#[derive(Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns.into()));
    }
}

/// Milliseconds since start-up, truncated to 32 bits like a microcontroller
/// tick counter.
pub struct ProcessClock(Instant);

impl ProcessClock {
    pub fn new() -> Self {
        Self(Instant::now())
    }
}

impl Monotonic for ProcessClock {
    fn now_ms(&self) -> u32 {
        self.0.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_faults_hit_every_nth_read() {
        let mut dht = SimulatedDht::new(3);
        let nan_reads: Vec<bool> = (0..6)
            .map(|_| dht.measure().map(|(t, _)| t.is_nan()).unwrap_or(true))
            .collect();
        assert_eq!(nan_reads, [false, false, true, false, false, true]);
    }

    #[test]
    fn simulated_values_stay_in_physical_range() {
        let mut dht = SimulatedDht::new(0);
        for _ in 0..200 {
            let (t, h) = dht.measure().unwrap();
            assert!((10.0..=40.0).contains(&t), "temperature {t}");
            assert!((0.0..=100.0).contains(&h), "humidity {h}");
        }
    }
}
