//! Wall-clock timestamps for outgoing telemetry.

use core::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};

use crate::ports::WallClock;

/// Errors a [`WallClock`] adapter can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("time has not been synchronised yet")]
    NotSynced,
    #[error("time synchronisation timed out")]
    Timeout,
}

/// Anything before this instant comes from a clock that never synced.
pub fn sync_horizon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct TimeSource<C> {
    clock: C,
    timeout: Duration,
}

impl<C: WallClock> TimeSource<C> {
    pub fn new(clock: C, timeout: Duration) -> Self {
        Self { clock, timeout }
    }

    /// One bounded attempt at the current time. `None` means "unknown"; the
    /// collector then stamps the payload with its receipt time.
    pub fn now(&mut self) -> Option<DateTime<Utc>> {
        match self.clock.utc_now(self.timeout) {
            Ok(now) if now >= sync_horizon() => Some(now),
            Ok(now) => {
                warn!("Clock reports {now}, not synchronised; sending without timestamp");
                None
            }
            Err(e) => {
                debug!("No wall-clock time: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<DateTime<Utc>, ClockError>);

    impl WallClock for Fixed {
        type Error = ClockError;

        fn utc_now(&mut self, _timeout: Duration) -> Result<DateTime<Utc>, ClockError> {
            self.0
        }
    }

    fn source(result: Result<DateTime<Utc>, ClockError>) -> TimeSource<Fixed> {
        TimeSource::new(Fixed(result), Duration::from_secs(5))
    }

    #[test]
    fn synced_time_is_returned() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(source(Ok(at)).now(), Some(at));
    }

    #[test]
    fn failure_degrades_to_absent() {
        assert_eq!(source(Err(ClockError::Timeout)).now(), None);
        assert_eq!(source(Err(ClockError::NotSynced)).now(), None);
    }

    #[test]
    fn epoch_time_counts_as_unsynced() {
        let boot = Utc.timestamp_opt(42, 0).unwrap();
        assert_eq!(source(Ok(boot)).now(), None);
    }
}
