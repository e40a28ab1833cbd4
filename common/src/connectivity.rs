//! Network link lifecycle and reconnect policy.

use climate_node_model::LinkState;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::indicator::StatusIndicator;
use crate::ports::Radio;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Association attempts before giving up for this cycle.
    pub attempts: u32,
    pub retry_delay_ms: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            retry_delay_ms: 500,
        }
    }
}

/// The node's view of its link. Owned by the loop; only
/// [`ConnectivityManager`] changes it.
#[derive(Debug, Default)]
pub struct LinkContext {
    state: LinkState,
}

impl LinkContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_up(&self) -> bool {
        self.state.is_up()
    }

    fn set(&mut self, next: LinkState) {
        if self.state != next {
            info!("Link {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

pub struct ConnectivityManager<R, D> {
    radio: R,
    delay: D,
    policy: ReconnectPolicy,
}

impl<R: Radio, D: DelayNs> ConnectivityManager<R, D> {
    pub fn new(radio: R, delay: D, policy: ReconnectPolicy) -> Self {
        Self {
            radio,
            delay,
            policy,
        }
    }

    /// Makes sure the link is up before the network is used.
    ///
    /// Returns at once when the link is already up. Otherwise runs at most
    /// `policy.attempts` association attempts, `policy.retry_delay_ms` apart,
    /// and leaves the link `Up` or `Down`. Never fails: callers check the
    /// returned state.
    pub fn ensure_link<P, D2>(
        &mut self,
        link: &mut LinkContext,
        indicator: &mut StatusIndicator<P, D2>,
    ) -> LinkState
    where
        P: OutputPin,
        D2: DelayNs,
    {
        if self.refresh(link, indicator).is_up() {
            return LinkState::Up;
        }

        if self.radio.is_connected() {
            Self::transition(link, indicator, LinkState::Up);
            return LinkState::Up;
        }

        Self::transition(link, indicator, LinkState::Connecting);

        let attempts = self.policy.attempts;
        for attempt in 1..=attempts {
            match self.radio.connect() {
                Ok(()) if self.radio.is_connected() => {
                    info!("Network associated on attempt {attempt}/{attempts}");
                    Self::transition(link, indicator, LinkState::Up);
                    return LinkState::Up;
                }
                Ok(()) => warn!("Attempt {attempt}/{attempts}: associated but interface not up"),
                Err(e) => warn!("Attempt {attempt}/{attempts}: {e}"),
            }

            if attempt < attempts {
                self.delay.delay_ms(self.policy.retry_delay_ms);
            }
        }

        warn!("Could not associate after {attempts} attempts");
        Self::transition(link, indicator, LinkState::Down);
        LinkState::Down
    }

    /// Notices a dropped association without trying to reconnect.
    pub fn refresh<P, D2>(
        &mut self,
        link: &mut LinkContext,
        indicator: &mut StatusIndicator<P, D2>,
    ) -> LinkState
    where
        P: OutputPin,
        D2: DelayNs,
    {
        if link.is_up() && !self.radio.is_connected() {
            warn!("Network association lost");
            Self::transition(link, indicator, LinkState::Down);
        }
        link.state()
    }

    fn transition<P, D2>(
        link: &mut LinkContext,
        indicator: &mut StatusIndicator<P, D2>,
        next: LinkState,
    ) where
        P: OutputPin,
        D2: DelayNs,
    {
        link.set(next);
        indicator.show_link(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FlakyRadio {
        connected: Rc<Cell<bool>>,
        failures_left: u32,
        connect_calls: Rc<Cell<u32>>,
    }

    impl Radio for FlakyRadio {
        type Error = &'static str;

        fn is_connected(&mut self) -> bool {
            self.connected.get()
        }

        fn connect(&mut self) -> Result<(), Self::Error> {
            self.connect_calls.set(self.connect_calls.get() + 1);
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err("no beacon");
            }
            self.connected.set(true);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Sleep(Rc<Cell<u64>>);

    impl DelayNs for Sleep {
        fn delay_ns(&mut self, ns: u32) {
            self.0.set(self.0.get() + u64::from(ns));
        }
    }

    struct Led;

    impl embedded_hal::digital::ErrorType for Led {
        type Error = Infallible;
    }

    impl OutputPin for Led {
        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    struct Rig {
        manager: ConnectivityManager<FlakyRadio, Sleep>,
        connected: Rc<Cell<bool>>,
        calls: Rc<Cell<u32>>,
        slept: Sleep,
        indicator: StatusIndicator<Led, Sleep>,
    }

    fn rig(failures: u32, attempts: u32) -> Rig {
        let connected = Rc::new(Cell::new(false));
        let calls = Rc::new(Cell::new(0));
        let slept = Sleep::default();
        let radio = FlakyRadio {
            connected: connected.clone(),
            failures_left: failures,
            connect_calls: calls.clone(),
        };
        let policy = ReconnectPolicy {
            attempts,
            retry_delay_ms: 500,
        };
        Rig {
            manager: ConnectivityManager::new(radio, slept.clone(), policy),
            connected,
            calls,
            slept,
            indicator: StatusIndicator::new(Led, Sleep::default()),
        }
    }

    #[test]
    fn connects_after_transient_failures() {
        let mut rig = rig(3, 20);
        let mut link = LinkContext::new();

        let state = rig.manager.ensure_link(&mut link, &mut rig.indicator);

        assert_eq!(state, LinkState::Up);
        assert!(link.is_up());
        assert!(rig.indicator.is_lit());
        assert_eq!(rig.calls.get(), 4);
        assert_eq!(rig.slept.0.get(), 3 * 500 * 1_000_000);
    }

    #[test]
    fn gives_up_after_bounded_attempts() {
        let mut rig = rig(u32::MAX, 20);
        let mut link = LinkContext::new();

        let state = rig.manager.ensure_link(&mut link, &mut rig.indicator);

        assert_eq!(state, LinkState::Down);
        assert_eq!(link.state(), LinkState::Down);
        assert!(!rig.indicator.is_lit());
        assert_eq!(rig.calls.get(), 20);
        assert_eq!(rig.slept.0.get(), 19 * 500 * 1_000_000);
    }

    #[test]
    fn is_idempotent_when_up() {
        let mut rig = rig(0, 5);
        let mut link = LinkContext::new();

        rig.manager.ensure_link(&mut link, &mut rig.indicator);
        rig.manager.ensure_link(&mut link, &mut rig.indicator);
        rig.manager.ensure_link(&mut link, &mut rig.indicator);

        assert_eq!(rig.calls.get(), 1);
        assert_eq!(rig.slept.0.get(), 0);
    }

    #[test]
    fn refresh_detects_a_drop_without_reconnecting() {
        let mut rig = rig(0, 5);
        let mut link = LinkContext::new();
        rig.manager.ensure_link(&mut link, &mut rig.indicator);

        rig.connected.set(false);
        let state = rig.manager.refresh(&mut link, &mut rig.indicator);

        assert_eq!(state, LinkState::Down);
        assert!(!rig.indicator.is_lit());
        assert_eq!(rig.calls.get(), 1);

        assert_eq!(
            rig.manager.ensure_link(&mut link, &mut rig.indicator),
            LinkState::Up
        );
        assert_eq!(rig.calls.get(), 2);
    }

    #[test]
    fn adopts_an_association_made_elsewhere() {
        let mut rig = rig(0, 5);
        rig.connected.set(true);
        let mut link = LinkContext::new();

        assert_eq!(
            rig.manager.ensure_link(&mut link, &mut rig.indicator),
            LinkState::Up
        );
        assert_eq!(rig.calls.get(), 0);
    }
}
