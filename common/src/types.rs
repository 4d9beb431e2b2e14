//! Wire payloads for the command and telemetry topics.
//!
//! Inbound messages deserialize with per-field defaults so a sparse
//! command like `{"action":"on"}` is still well-formed; anything that is
//! not valid JSON is dropped wholesale by the dispatcher.

use serde::{Deserialize, Serialize};

use crate::sensor::SensorSample;

#[derive(Debug, Clone, Deserialize)]
pub struct AcCommandMessage {
    /// `"on"` or `"off"`; absent means the message carries no action and
    /// is ignored.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: u8,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_fan_speed")]
    pub fan_speed: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedCommandMessage {
    #[serde(default)]
    pub r: u8,
    #[serde(default)]
    pub g: u8,
    #[serde(default)]
    pub b: u8,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigUpdateMessage {
    /// Seconds between sensor polls.
    #[serde(default = "default_sample_interval_s")]
    pub sample_interval: u64,
    #[serde(default = "default_avg_samples")]
    pub avg_samples: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RebootMessage {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcStatusPayload {
    pub state: &'static str,
    pub temperature: u8,
    pub mode: &'static str,
    pub fan_speed: &'static str,
    pub confirmed: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedStatusPayload {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorRawPayload {
    pub temperature: f32,
    pub humidity: f32,
    pub timestamp: i64,
}

impl SensorRawPayload {
    pub fn from_sample(sample: &SensorSample) -> Self {
        Self {
            temperature: round1(sample.temperature),
            humidity: round1(sample.humidity),
            timestamp: sample.captured_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorAvgPayload {
    pub temp: f32,
    pub hum: f32,
    pub samples: usize,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatPayload {
    /// Seconds since boot.
    pub uptime: u64,
    pub wifi_rssi: i32,
    pub free_heap: u64,
}

/// Telemetry goes out with one decimal place.
pub fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

fn default_temperature() -> u8 {
    24
}

fn default_mode() -> String {
    "cool".to_string()
}

fn default_fan_speed() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sample_interval_s() -> u64 {
    30
}

fn default_avg_samples() -> usize {
    10
}
