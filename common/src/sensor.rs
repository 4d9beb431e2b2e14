//! Validation and fault accounting for ambient sensor readings.

use thiserror::Error;

pub const TEMP_PLAUSIBLE_MIN_C: f32 = -40.0;
pub const TEMP_PLAUSIBLE_MAX_C: f32 = 80.0;
pub const HUMIDITY_MIN_PCT: f32 = 0.0;
pub const HUMIDITY_MAX_PCT: f32 = 100.0;

/// Consecutive failed reads before the sensor is considered disconnected.
pub const DEFAULT_FAULT_THRESHOLD: u32 = 5;

/// What the probe hands back before validation; either channel may be NaN
/// when the bus read fails mid-transfer.
#[derive(Debug, Clone, Copy)]
pub struct RawReading {
    pub temperature: f32,
    pub humidity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub temperature: f32,
    pub humidity: f32,
    pub captured_at: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum SensorError {
    #[error("sensor returned NaN")]
    NotANumber,
    #[error("temperature {0} °C outside plausible range")]
    TemperatureOutOfRange(f32),
    #[error("humidity {0} % outside plausible range")]
    HumidityOutOfRange(f32),
}

pub fn validate(reading: RawReading, captured_at: i64) -> Result<SensorSample, SensorError> {
    if reading.temperature.is_nan() || reading.humidity.is_nan() {
        return Err(SensorError::NotANumber);
    }
    if !(TEMP_PLAUSIBLE_MIN_C..=TEMP_PLAUSIBLE_MAX_C).contains(&reading.temperature) {
        return Err(SensorError::TemperatureOutOfRange(reading.temperature));
    }
    if !(HUMIDITY_MIN_PCT..=HUMIDITY_MAX_PCT).contains(&reading.humidity) {
        return Err(SensorError::HumidityOutOfRange(reading.humidity));
    }
    Ok(SensorSample {
        temperature: reading.temperature,
        humidity: reading.humidity,
        captured_at,
    })
}

/// Tracks consecutive read failures so the orchestrator can raise a
/// persistent-fault indication while sampling keeps running.
#[derive(Debug)]
pub struct SensorMonitor {
    consecutive_failures: u32,
    fault_threshold: u32,
}

impl SensorMonitor {
    pub fn new(fault_threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            fault_threshold: fault_threshold.max(1),
        }
    }

    pub fn ingest(
        &mut self,
        reading: RawReading,
        captured_at: i64,
    ) -> Result<SensorSample, SensorError> {
        match validate(reading, captured_at) {
            Ok(sample) => {
                self.consecutive_failures = 0;
                Ok(sample)
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                Err(err)
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn has_persistent_fault(&self) -> bool {
        self.consecutive_failures >= self.fault_threshold
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reading(temperature: f32, humidity: f32) -> RawReading {
        RawReading {
            temperature,
            humidity,
        }
    }

    #[test]
    fn implausible_temperature_is_rejected_and_counted() {
        let mut monitor = SensorMonitor::new(DEFAULT_FAULT_THRESHOLD);
        let result = monitor.ingest(reading(200.0, 50.0), 0);
        assert_eq!(result, Err(SensorError::TemperatureOutOfRange(200.0)));
        assert_eq!(monitor.consecutive_failures(), 1);
        assert!(!monitor.has_persistent_fault());
    }

    #[test]
    fn nan_on_either_channel_is_rejected() {
        let mut monitor = SensorMonitor::new(DEFAULT_FAULT_THRESHOLD);
        assert_eq!(
            monitor.ingest(reading(f32::NAN, 50.0), 0),
            Err(SensorError::NotANumber)
        );
        assert_eq!(
            monitor.ingest(reading(21.0, f32::NAN), 0),
            Err(SensorError::NotANumber)
        );
        assert_eq!(monitor.consecutive_failures(), 2);
    }

    #[test]
    fn humidity_bounds_are_enforced() {
        assert_eq!(
            validate(reading(21.0, 120.0), 0),
            Err(SensorError::HumidityOutOfRange(120.0))
        );
        assert_eq!(
            validate(reading(21.0, -3.0), 0),
            Err(SensorError::HumidityOutOfRange(-3.0))
        );
    }

    #[test]
    fn success_resets_the_failure_counter() {
        let mut monitor = SensorMonitor::new(DEFAULT_FAULT_THRESHOLD);
        for _ in 0..3 {
            let _ = monitor.ingest(reading(f32::NAN, f32::NAN), 0);
        }
        assert_eq!(monitor.consecutive_failures(), 3);

        let sample = monitor.ingest(reading(22.5, 48.0), 1_700_000_000).unwrap();
        assert_eq!(sample.temperature, 22.5);
        assert_eq!(sample.captured_at, 1_700_000_000);
        assert_eq!(monitor.consecutive_failures(), 0);
    }

    #[test]
    fn persistent_fault_latches_at_threshold_while_sampling_continues() {
        let mut monitor = SensorMonitor::new(5);
        for i in 1..=5 {
            let _ = monitor.ingest(reading(f32::NAN, 50.0), 0);
            assert_eq!(monitor.has_persistent_fault(), i >= 5);
        }
        // further failures keep the fault raised
        let _ = monitor.ingest(reading(f32::NAN, 50.0), 0);
        assert!(monitor.has_persistent_fault());
    }
}
