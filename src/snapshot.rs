//! ==============================================================================
//! snapshot.rs - one consistent set of readings per request
//! ==============================================================================
//!
//! purpose:
//!     runs every reader once, in a fixed order, and bundles the results.
//!     the snapshot is only handed out whole; renderers and the publisher
//!     never see a half-filled one.
//!
//! relationships:
//!     - uses: sensors.rs (ClimateReader, GasReader)
//!     - used by: orchestrator.rs, page.rs, publisher.rs
//!
//! ==============================================================================

use crate::config::SensorsConfig;
use crate::hal::HardwareProvider;
use crate::sensors::{ClimateReader, GasReader, SensorKind, SensorValue};

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSnapshot {
    temperature: SensorValue,
    humidity: SensorValue,
    gas_a: SensorValue,
    gas_b: SensorValue,
}

impl ReadingSnapshot {
    pub fn new(temperature: SensorValue, humidity: SensorValue, gas_a: SensorValue, gas_b: SensorValue) -> Self {
        debug_assert_eq!(temperature.kind(), SensorKind::Temperature);
        debug_assert_eq!(humidity.kind(), SensorKind::Humidity);
        debug_assert_eq!(gas_a.kind(), SensorKind::GasA);
        debug_assert_eq!(gas_b.kind(), SensorKind::GasB);
        Self { temperature, humidity, gas_a, gas_b }
    }

    /// every slot invalid
    pub fn faulted() -> Self {
        Self::new(
            SensorValue::fault(SensorKind::Temperature),
            SensorValue::fault(SensorKind::Humidity),
            SensorValue::fault(SensorKind::GasA),
            SensorValue::fault(SensorKind::GasB),
        )
    }

    pub fn temperature(&self) -> &SensorValue {
        &self.temperature
    }

    pub fn humidity(&self) -> &SensorValue {
        &self.humidity
    }

    pub fn gas_a(&self) -> &SensorValue {
        &self.gas_a
    }

    pub fn gas_b(&self) -> &SensorValue {
        &self.gas_b
    }

    /// temperature, humidity, gas a, gas b
    pub fn values(&self) -> [&SensorValue; 4] {
        [&self.temperature, &self.humidity, &self.gas_a, &self.gas_b]
    }

    pub fn valid_count(&self) -> usize {
        self.values().iter().filter(|v| v.is_valid()).count()
    }
}

/// the node's fixed set of readers
#[derive(Debug, Clone)]
pub struct SensorSet {
    climate: ClimateReader,
    gas_a: GasReader,
    gas_b: GasReader,
}

impl SensorSet {
    pub fn new(config: &SensorsConfig) -> Self {
        Self {
            climate: ClimateReader::new(&config.climate),
            gas_a: GasReader::new(SensorKind::GasA, &config.gas_a),
            gas_b: GasReader::new(SensorKind::GasB, &config.gas_b),
        }
    }

    /// reads climate, gas a, gas b in that order. never fails, never retries.
    pub fn capture(&self, hw: &dyn HardwareProvider) -> ReadingSnapshot {
        let (temperature, humidity) = self.climate.read(hw);
        let gas_a = self.gas_a.read(hw);
        let gas_b = self.gas_b.read(hw);
        ReadingSnapshot::new(temperature, humidity, gas_a, gas_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::testing::FakeHardware;

    #[test]
    fn test_capture_every_fault_combination() {
        let set = SensorSet::new(&SensorsConfig::default());

        for mask in 0u8..8 {
            let climate_ok = mask & 1 != 0;
            let a_ok = mask & 2 != 0;
            let b_ok = mask & 4 != 0;
            let hw = FakeHardware {
                climate: climate_ok.then_some((21.0, 40.0)),
                adc: [a_ok.then_some(1000), b_ok.then_some(2000)],
            };

            let snapshot = set.capture(&hw);
            assert_eq!(snapshot.temperature().is_valid(), climate_ok);
            assert_eq!(snapshot.humidity().is_valid(), climate_ok);
            assert_eq!(snapshot.gas_a().is_valid(), a_ok);
            assert_eq!(snapshot.gas_b().is_valid(), b_ok);
        }
    }

    #[test]
    fn test_values_are_ordered() {
        let snapshot = SensorSet::new(&SensorsConfig::default()).capture(&FakeHardware::healthy());
        let kinds: Vec<_> = snapshot.values().iter().map(|v| v.kind()).collect();
        assert_eq!(
            kinds,
            vec![SensorKind::Temperature, SensorKind::Humidity, SensorKind::GasA, SensorKind::GasB]
        );
        assert_eq!(snapshot.valid_count(), 4);
    }

    #[test]
    fn test_faulted_snapshot() {
        let snapshot = ReadingSnapshot::faulted();
        assert_eq!(snapshot.valid_count(), 0);
        assert!(snapshot.values().iter().all(|v| v.raw() == 0.0));
    }
}
