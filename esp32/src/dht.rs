use std::time::{Duration, Instant};

use climate_node_common::dht::{self, DhtError, DhtKind, FRAME_LEN};
use climate_node_common::Hygrometer;

/// Bit-banged DHT11/DHT22 on a raw GPIO number.
pub struct Dht {
    kind: DhtKind,
    pin: i32,
    last_read: Option<Instant>,
}

impl Dht {
    pub fn new(kind: DhtKind, pin: i32) -> Self {
        Self {
            kind,
            pin,
            last_read: None,
        }
    }

    /// Microseconds the line stayed at `state`, or `None` past `max_wait`.
    fn level_duration(&self, max_wait: u32, state: i32) -> Option<u32> {
        use esp_idf_svc::sys::*;

        let mut u_sec = 0;
        unsafe {
            while gpio_get_level(self.pin) == state {
                u_sec += 1;
                if u_sec > max_wait {
                    return None;
                }
                ets_delay_us(1);
            }
        }
        Some(u_sec)
    }

    fn read_frame(&self) -> Result<[u8; FRAME_LEN], DhtError> {
        use esp_idf_svc::sys::*;

        let mut frame = [0u8; FRAME_LEN];

        unsafe {
            gpio_set_direction(self.pin, GPIO_MODE_DEF_OUTPUT);

            // wake-up pulse, then release the line
            gpio_set_level(self.pin, 0);
            ets_delay_us(self.kind.start_pulse_us());
            gpio_set_level(self.pin, 1);
            ets_delay_us(25);

            gpio_set_direction(self.pin, GPIO_MODE_DEF_INPUT);
        }

        // Sensor answers 80 us low, 80 us high.
        self.level_duration(85, 0).ok_or(DhtError::Timeout)?;
        self.level_duration(85, 1).ok_or(DhtError::Timeout)?;

        for bit in 0..FRAME_LEN * 8 {
            self.level_duration(56, 0).ok_or(DhtError::Timeout)?;
            let high = self.level_duration(75, 1).ok_or(DhtError::Timeout)?;
            // ~27 us high is a 0, ~70 us a 1
            if high > 40 {
                frame[bit / 8] |= 1 << (7 - bit % 8);
            }
        }

        Ok(frame)
    }
}

impl Hygrometer for Dht {
    type Error = DhtError;

    fn model(&self) -> &str {
        self.kind.name()
    }

    fn measure(&mut self) -> Result<(f32, f32), DhtError> {
        let min_interval = Duration::from_millis(self.kind.min_interval_ms().into());
        if let Some(elapsed) = self.last_read.map(|at| at.elapsed()) {
            if elapsed < min_interval {
                std::thread::sleep(min_interval - elapsed);
            }
        }

        let frame = self.read_frame();
        self.last_read = Some(Instant::now());
        dht::decode(self.kind, &frame?)
    }
}
