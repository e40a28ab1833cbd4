//! Cooperative fixed-interval loop.

use embedded_hal::delay::DelayNs;
use log::info;

use crate::node::{CycleReport, Pipeline};
use crate::ports::Monotonic;

/// Decides when the next cycle is due on a wrapping millisecond counter.
///
/// Elapsed time is `now - last` in wrapping arithmetic, so the counter rolling
/// over past `u32::MAX` never stalls the schedule. This holds for any `u32`
/// period as long as the timer is checked at least once per counter wrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalTimer {
    period_ms: u32,
    last_ms: Option<u32>,
}

impl IntervalTimer {
    /// A timer whose first check is already due.
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    pub fn is_due(&self, now_ms: u32) -> bool {
        match self.last_ms {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) >= self.period_ms,
        }
    }

    /// Starts the next period at `now_ms`.
    pub fn mark(&mut self, now_ms: u32) {
        self.last_ms = Some(now_ms);
    }

    pub fn remaining_ms(&self, now_ms: u32) -> u32 {
        match self.last_ms {
            None => 0,
            Some(last) => self.period_ms.saturating_sub(now_ms.wrapping_sub(last)),
        }
    }
}

pub struct Scheduler<M, D> {
    clock: M,
    delay: D,
    timer: IntervalTimer,
    poll_interval_ms: u32,
}

impl<M: Monotonic, D: DelayNs> Scheduler<M, D> {
    pub fn new(clock: M, delay: D, interval_ms: u32, poll_interval_ms: u32) -> Self {
        Self {
            clock,
            delay,
            timer: IntervalTimer::new(interval_ms),
            poll_interval_ms,
        }
    }

    /// One wake-up: runs a cycle when it is due, otherwise only watches the
    /// link.
    pub fn poll<N: Pipeline>(&mut self, node: &mut N) -> Option<CycleReport> {
        let now = self.clock.now_ms();
        if !self.timer.is_due(now) {
            node.watch_link();
            return None;
        }

        self.timer.mark(now);
        let report = node.run_cycle();
        info!(
            "Next cycle in {} ms",
            self.timer.remaining_ms(self.clock.now_ms())
        );
        Some(report)
    }

    /// Polls until `done` accepts a report.
    pub fn run_until<N, F>(&mut self, node: &mut N, mut done: F) -> CycleReport
    where
        N: Pipeline,
        F: FnMut(&CycleReport) -> bool,
    {
        loop {
            if let Some(report) = self.poll(node) {
                if done(&report) {
                    return report;
                }
            }
            self.delay.delay_ms(self.poll_interval_ms);
        }
    }

    /// The node's main loop. Never returns.
    pub fn run<N: Pipeline>(&mut self, node: &mut N) -> ! {
        loop {
            self.poll(node);
            self.delay.delay_ms(self.poll_interval_ms);
        }
    }
}
