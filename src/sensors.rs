//! ==============================================================================
//! sensors.rs - per-sensor readers with fault isolation
//! ==============================================================================
//!
//! purpose:
//!     turns raw transducer signals into engineering-unit values.
//!     a reader never returns an error: any hardware fault is logged here
//!     and becomes `SensorValue::fault`, so one dead sensor cannot take the
//!     request (or the node) down with it.
//!
//! relationships:
//!     - uses: hal.rs (HardwareProvider)
//!     - used by: snapshot.rs (SensorSet::capture)
//!
//! ==============================================================================

use crate::config::{ClimateConfig, ClimateModel, GasSensorConfig};
use crate::hal::HardwareProvider;

/// full-scale value of a 16-bit adc sample
pub const ADC_FULL_SCALE: f64 = 65535.0;

/// raw value carried by a failed reading
pub const SENTINEL: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Humidity,
    GasA,
    GasB,
}

impl SensorKind {
    pub fn is_voltage(&self) -> bool {
        matches!(self, SensorKind::GasA | SensorKind::GasB)
    }
}

/// one reading, valid or not. immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorValue {
    kind: SensorKind,
    raw: f64,
    valid: bool,
}

impl SensorValue {
    pub fn reading(kind: SensorKind, raw: f64) -> Self {
        Self { kind, raw, valid: true }
    }

    pub fn fault(kind: SensorKind) -> Self {
        Self { kind, raw: SENTINEL, valid: false }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn raw(&self) -> f64 {
        self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// a zero reading cannot be told apart from a failed one
    pub fn is_error(&self) -> bool {
        !self.valid || self.raw == SENTINEL
    }

    /// numeric text for the page and the telemetry payload.
    /// climate values use the shortest exact form ("24.5", "60"),
    /// voltages always keep a fractional part ("2.0").
    pub fn format_raw(&self) -> String {
        let text = self.raw.to_string();
        if self.kind.is_voltage() && self.raw.is_finite() && !text.contains('.') {
            format!("{}.0", text)
        } else {
            text
        }
    }
}

pub fn adc_to_voltage(sample: u16, vref: f64) -> f64 {
    sample as f64 * vref / ADC_FULL_SCALE
}

/// temperature + humidity from one combined measurement
#[derive(Debug, Clone)]
pub struct ClimateReader {
    model: ClimateModel,
    pin: u8,
}

impl ClimateReader {
    pub fn new(config: &ClimateConfig) -> Self {
        Self { model: config.model, pin: config.gpio_pin }
    }

    /// both values are valid together or invalid together
    pub fn read(&self, hw: &dyn HardwareProvider) -> (SensorValue, SensorValue) {
        match hw.read_climate(self.model, self.pin) {
            Ok((temperature, humidity)) => {
                tracing::debug!(
                    "[{}] Temp: {}°C | Humidity: {}%",
                    self.model.as_str().to_uppercase(),
                    temperature,
                    humidity
                );
                (
                    SensorValue::reading(SensorKind::Temperature, temperature),
                    SensorValue::reading(SensorKind::Humidity, humidity),
                )
            }
            Err(e) => {
                tracing::warn!("[{}] ⚠ Read error: {}", self.model.as_str().to_uppercase(), e);
                (
                    SensorValue::fault(SensorKind::Temperature),
                    SensorValue::fault(SensorKind::Humidity),
                )
            }
        }
    }
}

/// analog gas sensor behind one adc channel
#[derive(Debug, Clone)]
pub struct GasReader {
    kind: SensorKind,
    label: String,
    channel: u8,
    vref: f64,
}

impl GasReader {
    pub fn new(kind: SensorKind, config: &GasSensorConfig) -> Self {
        Self {
            kind,
            label: config.label.to_uppercase(),
            channel: config.adc_channel,
            vref: config.vref,
        }
    }

    pub fn read(&self, hw: &dyn HardwareProvider) -> SensorValue {
        match hw.read_adc(self.channel, self.vref) {
            Ok(sample) => {
                let voltage = adc_to_voltage(sample, self.vref);
                tracing::debug!("[{}] Voltage: {}", self.label, voltage);
                SensorValue::reading(self.kind, voltage)
            }
            Err(e) => {
                tracing::warn!("[{}] ⚠ Read error: {}", self.label, e);
                SensorValue::fault(self.kind)
            }
        }
    }
}
