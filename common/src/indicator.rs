//! Status LED driving.
//!
//! The LED is steady on while the link is up, steady off otherwise, and
//! blinks a pattern after every delivery attempt.

use climate_node_model::{DeliveryOutcome, LinkState};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use log::warn;

/// `count` blinks, each `period_ms` off-phase followed by `period_ms` back to
/// the steady level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlinkPattern {
    pub count: u8,
    pub period_ms: u32,
}

impl BlinkPattern {
    pub const HEARTBEAT: Self = Self::new(1, 50);
    pub const DELIVERED: Self = Self::new(3, 100);
    pub const SERVER_REJECTED: Self = Self::new(5, 200);
    pub const TRANSPORT_FAILED: Self = Self::new(10, 50);

    pub const fn new(count: u8, period_ms: u32) -> Self {
        Self { count, period_ms }
    }

    pub const fn for_outcome(outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Delivered => Self::DELIVERED,
            DeliveryOutcome::ServerRejected => Self::SERVER_REJECTED,
            DeliveryOutcome::TransportFailed => Self::TRANSPORT_FAILED,
        }
    }
}

pub struct StatusIndicator<P, D> {
    pin: P,
    delay: D,
    lit: bool,
}

impl<P: OutputPin, D: DelayNs> StatusIndicator<P, D> {
    /// Takes ownership of the LED pin and turns it off.
    pub fn new(pin: P, delay: D) -> Self {
        let mut indicator = Self {
            pin,
            delay,
            lit: true,
        };
        indicator.set(false);
        indicator
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Steady level for `link`: on when up, off when down or connecting.
    pub fn show_link(&mut self, link: LinkState) {
        self.set(link.is_up());
    }

    /// Marks the start of a cycle.
    pub fn heartbeat(&mut self, link: LinkState) {
        self.blink(BlinkPattern::HEARTBEAT, link);
    }

    /// Renders the result of a delivery attempt, then settles on the steady
    /// level for `link`.
    pub fn signal(&mut self, outcome: DeliveryOutcome, link: LinkState) {
        self.blink(BlinkPattern::for_outcome(outcome), link);
    }

    fn blink(&mut self, pattern: BlinkPattern, link: LinkState) {
        let steady = link.is_up();
        for i in 0..pattern.count {
            self.set(!steady);
            self.delay.delay_ms(pattern.period_ms);
            self.set(steady);
            if i + 1 < pattern.count {
                self.delay.delay_ms(pattern.period_ms);
            }
        }
        self.set(steady);
    }

    fn set(&mut self, on: bool) {
        if self.lit == on {
            return;
        }
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.lit = on,
            Err(e) => warn!("Status LED write failed: {:?}", e.kind()),
        }
    }
}
