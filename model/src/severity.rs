use serde::{Deserialize, Serialize};

/// Severity of a single reading.
///
/// The serialized names are the ones the collector stores and the dashboard
/// filters on, so they stay in the collector's language.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLabel {
    Normal,
    AlertaTemperatura,
    AlertaUmidade,
    CriticoTemperatura,
    CriticoUmidade,
}

impl SeverityLabel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::AlertaTemperatura => "alerta_temperatura",
            Self::AlertaUmidade => "alerta_umidade",
            Self::CriticoTemperatura => "critico_temperatura",
            Self::CriticoUmidade => "critico_umidade",
        }
    }

    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::CriticoTemperatura | Self::CriticoUmidade)
    }

    pub const fn is_alert(&self) -> bool {
        matches!(self, Self::AlertaTemperatura | Self::AlertaUmidade)
    }
}

impl core::fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive `[min, max]` range.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Band {
    pub min: f32,
    pub max: f32,
}

impl Band {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// True when `value` is strictly below `min` or strictly above `max`.
    /// Bounds themselves count as inside. NaN is outside every band.
    pub fn excludes(&self, value: f32) -> bool {
        !(value >= self.min && value <= self.max)
    }
}

/// Alert and critical bands of one measured quantity.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct QuantityBands {
    pub alert: Band,
    pub critical: Band,
}

impl QuantityBands {
    /// Checks `critical.min < alert.min <= alert.max < critical.max`.
    pub fn is_nested(&self) -> bool {
        self.critical.min < self.alert.min
            && self.alert.min <= self.alert.max
            && self.alert.max < self.critical.max
    }
}

/// Threshold configuration for both quantities.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub temperature: QuantityBands,
    pub humidity: QuantityBands,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: QuantityBands {
                alert: Band::new(5.0, 30.0),
                critical: Band::new(0.0, 40.0),
            },
            humidity: QuantityBands {
                alert: Band::new(20.0, 90.0),
                critical: Band::new(10.0, 95.0),
            },
        }
    }
}

impl Thresholds {
    /// Maps a validated reading to its severity.
    ///
    /// First match wins, in this order: critical temperature, critical
    /// humidity, alert temperature, alert humidity. A reading that is critical
    /// on both quantities therefore reports `CriticoTemperatura`.
    pub fn classify(&self, temperature: f32, humidity: f32) -> SeverityLabel {
        if self.temperature.critical.excludes(temperature) {
            SeverityLabel::CriticoTemperatura
        } else if self.humidity.critical.excludes(humidity) {
            SeverityLabel::CriticoUmidade
        } else if self.temperature.alert.excludes(temperature) {
            SeverityLabel::AlertaTemperatura
        } else if self.humidity.alert.excludes(humidity) {
            SeverityLabel::AlertaUmidade
        } else {
            SeverityLabel::Normal
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.temperature.is_nested() && self.humidity.is_nested()
    }
}
