//! Frame decoding for the DHT11 and DHT22 single-wire sensors.
//!
//! Both parts answer a start pulse with 40 bits: humidity (2 bytes),
//! temperature (2 bytes) and a checksum byte. Only the scaling differs.

/// Bytes in one DHT frame.
pub const FRAME_LEN: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhtKind {
    Dht11,
    Dht22,
}

impl DhtKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dht11 => "DHT11",
            Self::Dht22 => "DHT22",
        }
    }

    /// How long the host holds the line low to wake the sensor.
    pub const fn start_pulse_us(&self) -> u32 {
        match self {
            Self::Dht11 => 18_000,
            Self::Dht22 => 3_000,
        }
    }

    /// Minimum time between two reads the part tolerates.
    pub const fn min_interval_ms(&self) -> u32 {
        match self {
            Self::Dht11 => 1_000,
            Self::Dht22 => 2_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DhtError {
    #[error("checksum mismatch (expected {expected:#04x}, got {actual:#04x})")]
    Checksum { expected: u8, actual: u8 },
    #[error("timed out waiting for the sensor")]
    Timeout,
}

/// Turns a raw frame into `(temperature_celsius, humidity_percent)`.
pub fn decode(kind: DhtKind, frame: &[u8; FRAME_LEN]) -> Result<(f32, f32), DhtError> {
    let expected = frame[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if expected != frame[4] {
        return Err(DhtError::Checksum {
            expected,
            actual: frame[4],
        });
    }

    let (temperature, humidity) = match kind {
        DhtKind::Dht22 => {
            let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 / 10.0;
            let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as f32 / 10.0;
            let temperature = if frame[2] & 0x80 != 0 {
                -magnitude
            } else {
                magnitude
            };
            (temperature, humidity)
        }
        DhtKind::Dht11 => {
            let humidity = frame[0] as f32 + frame[1] as f32 / 10.0;
            let magnitude = frame[2] as f32 + (frame[3] & 0x7F) as f32 / 10.0;
            let temperature = if frame[3] & 0x80 != 0 {
                -magnitude
            } else {
                magnitude
            };
            (temperature, humidity)
        }
    };

    Ok((temperature, humidity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_checksum(bytes: [u8; 4]) -> [u8; FRAME_LEN] {
        let sum = bytes.iter().fold(0u8, |s, b| s.wrapping_add(*b));
        [bytes[0], bytes[1], bytes[2], bytes[3], sum]
    }

    #[test]
    fn dht22_frame() {
        // 65.2 %RH, 35.1 C
        let frame = with_checksum([0x02, 0x8C, 0x01, 0x5F]);
        assert_eq!(decode(DhtKind::Dht22, &frame), Ok((35.1, 65.2)));
    }

    #[test]
    fn dht22_negative_temperature() {
        // -10.1 C
        let frame = with_checksum([0x01, 0x90, 0x80, 0x65]);
        let (temperature, humidity) = decode(DhtKind::Dht22, &frame).unwrap();
        assert_eq!(temperature, -10.1);
        assert_eq!(humidity, 40.0);
    }

    #[test]
    fn dht11_frame() {
        let frame = with_checksum([60, 2, 25, 5]);
        assert_eq!(decode(DhtKind::Dht11, &frame), Ok((25.5, 60.2)));
    }

    #[test]
    fn dht11_negative_temperature() {
        let frame = with_checksum([80, 0, 3, 0x80 | 4]);
        assert_eq!(decode(DhtKind::Dht11, &frame), Ok((-3.4, 80.0)));
    }

    #[test]
    fn checksum_wraps_at_eight_bits() {
        let frame = with_checksum([0xFF, 0xFF, 0x00, 0x10]);
        assert_eq!(frame[4], 0x0E);
        assert!(decode(DhtKind::Dht22, &frame).is_ok());
    }

    #[test]
    fn corrupted_frame_is_rejected() {
        let mut frame = with_checksum([60, 2, 25, 5]);
        frame[4] ^= 0x01;
        assert!(matches!(
            decode(DhtKind::Dht11, &frame),
            Err(DhtError::Checksum { .. })
        ));
    }
}
