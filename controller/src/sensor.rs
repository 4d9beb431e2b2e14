use aircon_common::{RawReading, SensorError, SensorMonitor, SensorSample};

/// Raw capture source. The host build synthesizes a slow deterministic
/// wave; tests script exact readings.
enum SensorProbe {
    Simulated { tick: u64 },
    #[cfg(test)]
    Scripted(std::collections::VecDeque<RawReading>),
}

impl SensorProbe {
    fn capture(&mut self) -> RawReading {
        match self {
            SensorProbe::Simulated { tick } => {
                *tick = tick.saturating_add(1);
                // Hardware integration point:
                // replace these simulated readings with the DHT22 driver on
                // the esp target.
                RawReading {
                    temperature: 21.0 + ((*tick % 8) as f32 * 0.2),
                    humidity: 45.0 + ((*tick % 6) as f32 * 0.5),
                }
            }
            #[cfg(test)]
            SensorProbe::Scripted(readings) => readings.pop_front().unwrap_or(RawReading {
                temperature: f32::NAN,
                humidity: f32::NAN,
            }),
        }
    }
}

/// Polls the probe and validates what comes back. Failed reads are
/// counted but never reach the telemetry buffers.
pub struct SensorReader {
    probe: SensorProbe,
    monitor: SensorMonitor,
}

impl SensorReader {
    pub fn simulated(fault_threshold: u32) -> Self {
        Self {
            probe: SensorProbe::Simulated { tick: 0 },
            monitor: SensorMonitor::new(fault_threshold),
        }
    }

    #[cfg(test)]
    pub fn scripted(
        readings: impl IntoIterator<Item = RawReading>,
        fault_threshold: u32,
    ) -> Self {
        Self {
            probe: SensorProbe::Scripted(readings.into_iter().collect()),
            monitor: SensorMonitor::new(fault_threshold),
        }
    }

    pub fn read(&mut self, captured_at: i64) -> Result<SensorSample, SensorError> {
        let raw = self.probe.capture();
        self.monitor.ingest(raw, captured_at)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.monitor.consecutive_failures()
    }

    pub fn has_persistent_fault(&self) -> bool {
        self.monitor.has_persistent_fault()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn simulated_probe_yields_plausible_samples() {
        let mut reader = SensorReader::simulated(5);
        for epoch in 0..20 {
            let sample = reader.read(epoch).expect("simulated read");
            assert!((15.0..=35.0).contains(&sample.temperature));
            assert!((30.0..=60.0).contains(&sample.humidity));
        }
        assert_eq!(reader.consecutive_failures(), 0);
    }

    #[test]
    fn scripted_failures_drive_the_fault_counter() {
        let mut reader = SensorReader::scripted(
            [
                RawReading {
                    temperature: 200.0,
                    humidity: 50.0,
                },
                RawReading {
                    temperature: 22.0,
                    humidity: 50.0,
                },
            ],
            5,
        );
        assert!(reader.read(0).is_err());
        assert_eq!(reader.consecutive_failures(), 1);
        assert!(reader.read(1).is_ok());
        assert_eq!(reader.consecutive_failures(), 0);
    }

    #[test]
    fn exhausted_script_reads_as_a_nan_fault() {
        let mut reader = SensorReader::scripted([], 1);
        assert!(reader.read(0).is_err());
        assert!(reader.has_persistent_fault());
    }
}
