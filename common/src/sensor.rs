//! One acquisition per cycle, validated before anything is classified.

use log::{info, warn};

use crate::ports::Hygrometer;

/// A validated pair of sensor values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub temperature: f32,
    pub humidity: f32,
}

/// Why an acquisition produced no usable values.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AcquisitionFault {
    #[error("{model} read failed: {reason}")]
    Driver { model: String, reason: String },
    #[error("{model} returned non-numeric values (temperature {temperature}, humidity {humidity})")]
    NotANumber {
        model: String,
        temperature: f32,
        humidity: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Acquisition {
    Valid(Measurement),
    Invalid(AcquisitionFault),
}

pub struct SensorReader<H> {
    sensor: H,
}

impl<H: Hygrometer> SensorReader<H> {
    pub fn new(sensor: H) -> Self {
        Self { sensor }
    }

    pub fn model(&self) -> &str {
        self.sensor.model()
    }

    /// Reads the sensor once. No retry: a bad read is reported and the next
    /// cycle tries again.
    pub fn read(&mut self) -> Acquisition {
        let (temperature, humidity) = match self.sensor.measure() {
            Ok(values) => values,
            Err(e) => {
                let fault = AcquisitionFault::Driver {
                    model: self.sensor.model().to_string(),
                    reason: e.to_string(),
                };
                warn!("{fault}");
                return Acquisition::Invalid(fault);
            }
        };

        if temperature.is_nan() || humidity.is_nan() {
            let fault = AcquisitionFault::NotANumber {
                model: self.sensor.model().to_string(),
                temperature,
                humidity,
            };
            warn!("{fault}");
            return Acquisition::Invalid(fault);
        }

        info!("Temperature: {temperature:.1} C, humidity: {humidity:.1} %");
        Acquisition::Valid(Measurement {
            temperature,
            humidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<Result<(f32, f32), &'static str>>);

    impl Hygrometer for Scripted {
        type Error = &'static str;

        fn model(&self) -> &str {
            "DHT11"
        }

        fn measure(&mut self) -> Result<(f32, f32), Self::Error> {
            self.0.remove(0)
        }
    }

    #[test]
    fn numeric_values_are_valid() {
        let mut reader = SensorReader::new(Scripted(vec![Ok((25.5, 60.2))]));
        assert_eq!(
            reader.read(),
            Acquisition::Valid(Measurement {
                temperature: 25.5,
                humidity: 60.2
            })
        );
    }

    #[test]
    fn any_nan_is_invalid() {
        let mut reader = SensorReader::new(Scripted(vec![
            Ok((f32::NAN, 50.0)),
            Ok((20.0, f32::NAN)),
            Ok((f32::NAN, f32::NAN)),
        ]));
        for _ in 0..3 {
            assert!(matches!(
                reader.read(),
                Acquisition::Invalid(AcquisitionFault::NotANumber { .. })
            ));
        }
    }

    #[test]
    fn driver_errors_are_invalid() {
        let mut reader = SensorReader::new(Scripted(vec![Err("timed out waiting for the sensor")]));
        match reader.read() {
            Acquisition::Invalid(fault) => assert_eq!(
                fault.to_string(),
                "DHT11 read failed: timed out waiting for the sensor"
            ),
            other => panic!("expected a fault, got {other:?}"),
        }
    }
}
