use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_CAPACITY;
use crate::ir::AcProtocolVariant;
use crate::sensor::DEFAULT_FAULT_THRESHOLD;
use crate::types::ConfigUpdateMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub keep_alive_secs: u64,
    /// Spacing between reconnect attempts after a transport failure.
    pub reconnect_delay_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: 1883,
            user: String::new(),
            pass: String::new(),
            keep_alive_secs: 60,
            reconnect_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub sample_interval_ms: u64,
    /// Window size for published averages; a completed window clears the
    /// buffers so cadence changes never mix.
    pub avg_samples: usize,
    pub buffer_capacity: usize,
    pub heartbeat_interval_ms: u64,
    pub sensor_fault_threshold: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 30_000,
            avg_samples: 10,
            buffer_capacity: DEFAULT_CAPACITY,
            heartbeat_interval_ms: 60_000,
            sensor_fault_threshold: DEFAULT_FAULT_THRESHOLD,
        }
    }
}

impl SamplingConfig {
    /// Remote config updates arrive unvalidated; a zero or absurd value
    /// would stall sampling entirely, so everything is clamped to sane
    /// operating bounds before use.
    pub fn sanitize(&mut self) {
        if self.buffer_capacity == 0 {
            self.buffer_capacity = DEFAULT_CAPACITY;
        }
        self.sample_interval_ms = self.sample_interval_ms.clamp(1_000, 3_600_000);
        self.avg_samples = self.avg_samples.clamp(1, self.buffer_capacity);
        self.heartbeat_interval_ms = self.heartbeat_interval_ms.clamp(5_000, 3_600_000);
        if self.sensor_fault_threshold == 0 {
            self.sensor_fault_threshold = 1;
        }
    }

    pub fn apply_update(&mut self, update: &ConfigUpdateMessage) {
        self.sample_interval_ms = update.sample_interval.saturating_mul(1_000);
        self.avg_samples = update.avg_samples;
        self.sanitize();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: String,
    pub mqtt: MqttConfig,
    pub sampling: SamplingConfig,
    pub protocol: AcProtocolVariant,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: "room_01".to_string(),
            mqtt: MqttConfig::default(),
            sampling: SamplingConfig::default(),
            protocol: AcProtocolVariant::default(),
        }
    }
}
