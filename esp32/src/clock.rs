use core::time::Duration;
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::sntp::EspSntp;
use log::{info, warn};

use climate_node_common::time_source::{sync_horizon, ClockError};
use climate_node_common::{Monotonic, WallClock};

const SYNC_POLL_MS: u32 = 100;

/// System time kept in step by SNTP.
///
/// The SNTP client starts on the first request, which the boot sequence
/// makes only after the network is up.
pub struct SntpClock {
    sntp: Option<EspSntp<'static>>,
}

impl SntpClock {
    pub fn new() -> Self {
        Self { sntp: None }
    }

    fn start(&mut self) -> Result<(), ClockError> {
        if self.sntp.is_none() {
            match EspSntp::new_default() {
                Ok(sntp) => {
                    info!("SNTP started");
                    self.sntp = Some(sntp);
                }
                Err(e) => {
                    warn!("Failed to start SNTP: {e}");
                    return Err(ClockError::NotSynced);
                }
            }
        }
        Ok(())
    }
}

fn system_utc() -> Option<DateTime<Utc>> {
    let since_epoch = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .ok()?;
    DateTime::from_timestamp(since_epoch.as_secs() as i64, since_epoch.subsec_nanos())
}

impl WallClock for SntpClock {
    type Error = ClockError;

    fn utc_now(&mut self, timeout: Duration) -> Result<DateTime<Utc>, ClockError> {
        self.start()?;

        let started = Instant::now();
        loop {
            match system_utc() {
                Some(now) if now >= sync_horizon() => return Ok(now),
                _ if started.elapsed() >= timeout => return Err(ClockError::Timeout),
                _ => FreeRtos::delay_ms(SYNC_POLL_MS),
            }
        }
    }
}

/// Milliseconds since boot from the high-resolution timer, wrapping at
/// `u32::MAX`.
pub struct BootClock;

impl Monotonic for BootClock {
    fn now_ms(&self) -> u32 {
        let micros = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        (micros / 1_000) as u32
    }
}
