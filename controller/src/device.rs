//! Device state and message dispatch.
//!
//! Everything here is synchronous: handlers take the current monotonic
//! and epoch clocks as arguments and return the publishes to perform,
//! so the whole control plane is unit-testable without a broker.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use aircon_common::topics::{
    CommandTopic, SUFFIX_AC_STATUS, SUFFIX_LED_STATUS, SUFFIX_SENSOR_AVG, SUFFIX_SENSOR_RAW,
    SUFFIX_SYSTEM_HEARTBEAT,
};
use aircon_common::types::round1;
use aircon_common::{
    AcCommandMessage, AcController, AcStatusPayload, ConfigUpdateMessage, DeviceConfig,
    HeartbeatPayload, LedCommandMessage, RebootMessage, SampleBuffer, SamplingConfig,
    SensorAvgPayload, SensorRawPayload,
};

use crate::ir::IrTransmitter;
use crate::led::{RgbLed, COLOR_GREEN};
use crate::sensor::SensorReader;

/// A publish produced by dispatch or a timer tick. Retained messages go
/// out at QoS 1, plain telemetry at QoS 0.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub suffix: &'static str,
    pub payload: String,
    pub retained: bool,
}

pub struct Device {
    ac: AcController,
    ir: IrTransmitter,
    led: RgbLed,
    sensor: SensorReader,
    temperature: SampleBuffer,
    humidity: SampleBuffer,
    sampling: SamplingConfig,
    reboot_requested: bool,
    config_changed: bool,
}

impl Device {
    pub fn new(config: &DeviceConfig) -> Self {
        Self::with_parts(
            config,
            IrTransmitter::disabled(),
            SensorReader::simulated(config.sampling.sensor_fault_threshold),
        )
    }

    fn with_parts(config: &DeviceConfig, ir: IrTransmitter, sensor: SensorReader) -> Self {
        Self {
            ac: AcController::new(config.protocol),
            ir,
            led: RgbLed::new(),
            sensor,
            temperature: SampleBuffer::with_capacity(config.sampling.buffer_capacity),
            humidity: SampleBuffer::with_capacity(config.sampling.buffer_capacity),
            sampling: config.sampling.clone(),
            reboot_requested: false,
            config_changed: false,
        }
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    pub fn reboot_requested(&self) -> bool {
        self.reboot_requested
    }

    /// True once after a `config/update` was applied; the run loop uses
    /// this to rebuild its tickers at the new cadence.
    pub fn take_config_changed(&mut self) -> bool {
        std::mem::take(&mut self.config_changed)
    }

    pub fn on_connected(&mut self, now_ms: u64) {
        self.led.start_blink(COLOR_GREEN, now_ms);
    }

    pub fn advance_led(&mut self, now_ms: u64) {
        self.led.advance(now_ms);
    }

    /// Routes one inbound payload by topic suffix. A payload that fails
    /// to parse is dropped wholesale; no handler runs and nothing is
    /// published.
    pub fn handle_message(
        &mut self,
        suffix: &str,
        payload: &[u8],
        now_ms: u64,
        epoch: i64,
    ) -> Vec<OutboundMessage> {
        let Some(topic) = CommandTopic::from_suffix(suffix) else {
            debug!(suffix, "ignoring message on unrouted topic");
            return Vec::new();
        };

        match topic {
            CommandTopic::AcCommand => decode(suffix, payload)
                .map(|cmd| self.handle_ac_command(&cmd, now_ms, epoch))
                .unwrap_or_default(),
            CommandTopic::LedCommand => decode(suffix, payload)
                .map(|cmd| self.handle_led_command(&cmd))
                .unwrap_or_default(),
            CommandTopic::ConfigUpdate => decode(suffix, payload)
                .map(|update| self.handle_config_update(&update))
                .unwrap_or_default(),
            CommandTopic::SystemReboot => decode(suffix, payload)
                .map(|request| self.handle_reboot(&request))
                .unwrap_or_default(),
        }
    }

    fn handle_ac_command(
        &mut self,
        cmd: &AcCommandMessage,
        now_ms: u64,
        epoch: i64,
    ) -> Vec<OutboundMessage> {
        let power = match cmd.action.as_deref() {
            Some("on") => true,
            Some("off") => false,
            Some(other) => {
                warn!(action = other, "unknown ac action, ignoring command");
                return Vec::new();
            }
            None => {
                debug!("ac command without action, ignoring");
                return Vec::new();
            }
        };

        let Some(signal) =
            self.ac
                .send_command(power, cmd.temperature, &cmd.mode, &cmd.fan_speed, now_ms)
        else {
            debug!("ac command rejected by rate limiter");
            return Vec::new();
        };

        if let Err(err) = self.ir.transmit(&signal) {
            warn!("IR transmission failed: {err:#}");
        } else {
            debug!(
                bytes = ?signal.bytes,
                sent_frames = self.ir.sent_frames(),
                "ir frame transmitted"
            );
        }

        let state = self.ac.state();
        let state_str = if state.power { "on" } else { "off" };
        info!(
            state = state_str,
            temperature = state.temperature,
            mode = state.mode.as_str(),
            fan_speed = state.fan_speed.as_str(),
            "ac command applied"
        );

        encode(
            SUFFIX_AC_STATUS,
            true,
            &AcStatusPayload {
                state: state_str,
                temperature: state.temperature,
                mode: state.mode.as_str(),
                fan_speed: state.fan_speed.as_str(),
                confirmed: true,
                timestamp: epoch,
            },
        )
        .into_iter()
        .collect()
    }

    fn handle_led_command(&mut self, cmd: &LedCommandMessage) -> Vec<OutboundMessage> {
        self.led.apply(cmd.r, cmd.g, cmd.b, cmd.enabled);
        encode(SUFFIX_LED_STATUS, true, &self.led.status())
            .into_iter()
            .collect()
    }

    fn handle_config_update(&mut self, update: &ConfigUpdateMessage) -> Vec<OutboundMessage> {
        self.sampling.apply_update(update);
        // Samples taken at the old cadence must not blend into the next
        // published average.
        self.temperature.clear();
        self.humidity.clear();
        self.config_changed = true;
        info!(
            sample_interval_ms = self.sampling.sample_interval_ms,
            avg_samples = self.sampling.avg_samples,
            "sampling configuration updated, buffers cleared"
        );
        Vec::new()
    }

    fn handle_reboot(&mut self, request: &RebootMessage) -> Vec<OutboundMessage> {
        if request.confirm {
            info!("reboot confirmed via command topic");
            self.reboot_requested = true;
        } else {
            warn!("reboot command without confirmation, ignoring");
        }
        Vec::new()
    }

    /// One sensor poll. A valid sample feeds both buffers and goes out
    /// raw; completing the averaging window also publishes the mean and
    /// resets the buffers. Failed reads leave the buffers untouched.
    pub fn sample_tick(&mut self, epoch: i64) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        match self.sensor.read(epoch) {
            Ok(sample) => {
                self.temperature.push(sample.temperature);
                self.humidity.push(sample.humidity);
                self.led.show_temperature(sample.temperature);
                out.extend(encode(
                    SUFFIX_SENSOR_RAW,
                    false,
                    &SensorRawPayload::from_sample(&sample),
                ));

                if self.temperature.size() >= self.sampling.avg_samples {
                    let window = self.sampling.avg_samples;
                    let samples = window.min(self.temperature.size());
                    if let (Some(temp), Some(hum)) = (
                        self.temperature.average(window),
                        self.humidity.average(window),
                    ) {
                        out.extend(encode(
                            SUFFIX_SENSOR_AVG,
                            false,
                            &SensorAvgPayload {
                                temp: round1(temp),
                                hum: round1(hum),
                                samples,
                                timestamp: epoch,
                            },
                        ));
                    }
                    self.temperature.clear();
                    self.humidity.clear();
                }
            }
            Err(err) => {
                warn!(
                    failures = self.sensor.consecutive_failures(),
                    "sensor read failed: {err}"
                );
                if self.sensor.has_persistent_fault() {
                    self.led.show_fault();
                }
            }
        }
        out
    }

    pub fn heartbeat_tick(&self, now_ms: u64, wifi_rssi: i32, free_heap: u64) -> Vec<OutboundMessage> {
        encode(
            SUFFIX_SYSTEM_HEARTBEAT,
            false,
            &HeartbeatPayload {
                uptime: now_ms / 1_000,
                wifi_rssi,
                free_heap,
            },
        )
        .into_iter()
        .collect()
    }
}

fn decode<T: DeserializeOwned>(suffix: &str, payload: &[u8]) -> Option<T> {
    match serde_json::from_slice(payload) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(suffix, %err, "dropping unparseable command payload");
            None
        }
    }
}

fn encode<T: Serialize>(suffix: &'static str, retained: bool, payload: &T) -> Option<OutboundMessage> {
    match serde_json::to_string(payload) {
        Ok(body) => Some(OutboundMessage {
            suffix,
            payload: body,
            retained,
        }),
        Err(err) => {
            warn!(suffix, %err, "payload serialization failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use aircon_common::RawReading;

    use super::*;

    fn reading(temperature: f32, humidity: f32) -> RawReading {
        RawReading {
            temperature,
            humidity,
        }
    }

    fn device_with(config: &DeviceConfig, readings: Vec<RawReading>) -> Device {
        Device::with_parts(
            config,
            IrTransmitter::capture(),
            SensorReader::scripted(readings, config.sampling.sensor_fault_threshold),
        )
    }

    fn device() -> Device {
        device_with(&DeviceConfig::default(), Vec::new())
    }

    fn json(message: &OutboundMessage) -> serde_json::Value {
        serde_json::from_str(&message.payload).unwrap()
    }

    #[test]
    fn ac_command_transmits_and_confirms_retained_status() {
        let mut dev = device();
        let out = dev.handle_message(
            "ac/command",
            br#"{"action":"on","temperature":22,"mode":"cool","fan_speed":"high"}"#,
            10_000,
            1_700_000_000,
        );

        assert_eq!(dev.ir.captured().len(), 1);
        assert_eq!(dev.ir.captured()[0].bytes, [0xB2, 0x3F, 0x70]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].suffix, "ac/status");
        assert!(out[0].retained);
        let status = json(&out[0]);
        assert_eq!(status["state"], "on");
        assert_eq!(status["temperature"], 22);
        assert_eq!(status["mode"], "cool");
        assert_eq!(status["fan_speed"], "high");
        assert_eq!(status["confirmed"], true);
        assert_eq!(status["timestamp"], 1_700_000_000_i64);
    }

    #[test]
    fn rate_limited_command_produces_no_transmission_and_no_status() {
        let mut dev = device();
        let on = br#"{"action":"on","temperature":22}"#;
        let off = br#"{"action":"off"}"#;

        assert_eq!(dev.handle_message("ac/command", on, 10_000, 0).len(), 1);
        let rejected = dev.handle_message("ac/command", off, 11_500, 0);
        assert!(rejected.is_empty());
        assert_eq!(dev.ir.captured().len(), 1);
        assert!(dev.ac.state().power);

        // past the interval the same command goes through
        let accepted = dev.handle_message("ac/command", off, 12_000, 0);
        assert_eq!(accepted.len(), 1);
        assert_eq!(dev.ir.captured().len(), 2);
        assert!(!dev.ac.state().power);
    }

    #[test]
    fn ac_command_without_action_is_a_no_op() {
        let mut dev = device();
        let out = dev.handle_message("ac/command", br#"{"temperature":25}"#, 0, 0);
        assert!(out.is_empty());
        assert!(dev.ir.captured().is_empty());
    }

    #[test]
    fn unknown_ac_action_is_dropped() {
        let mut dev = device();
        let out = dev.handle_message("ac/command", br#"{"action":"toggle"}"#, 0, 0);
        assert!(out.is_empty());
        assert!(dev.ir.captured().is_empty());
    }

    #[test]
    fn malformed_json_has_zero_observable_side_effects() {
        let mut dev = device();
        for suffix in ["ac/command", "led/command", "config/update", "system/reboot"] {
            let out = dev.handle_message(suffix, b"{\"action\":", 0, 0);
            assert!(out.is_empty(), "{suffix} produced output");
        }
        assert!(dev.ir.captured().is_empty());
        assert!(!dev.reboot_requested());
        assert!(!dev.take_config_changed());
        assert_eq!(dev.sampling.sample_interval_ms, 30_000);
    }

    #[test]
    fn messages_on_unrouted_topics_are_ignored() {
        let mut dev = device();
        let out = dev.handle_message("sensor/raw", br#"{"temperature":22}"#, 0, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn led_command_applies_and_reports_retained_status() {
        let mut dev = device();
        let out = dev.handle_message("led/command", br#"{"r":255,"b":40,"enabled":true}"#, 0, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].suffix, "led/status");
        assert!(out[0].retained);
        let status = json(&out[0]);
        assert_eq!(status["r"], 255);
        assert_eq!(status["g"], 0);
        assert_eq!(status["b"], 40);
        assert_eq!(status["enabled"], true);
    }

    #[test]
    fn config_update_clears_buffers_and_flags_timer_rebuild() {
        let mut dev = device_with(
            &DeviceConfig::default(),
            vec![reading(22.0, 50.0), reading(23.0, 51.0)],
        );
        dev.sample_tick(1);
        dev.sample_tick(2);
        assert_eq!(dev.temperature.size(), 2);
        assert_eq!(dev.humidity.size(), 2);

        let out = dev.handle_message(
            "config/update",
            br#"{"sample_interval":10,"avg_samples":5}"#,
            0,
            0,
        );
        assert!(out.is_empty());
        assert_eq!(dev.temperature.size(), 0);
        assert_eq!(dev.humidity.size(), 0);
        assert_eq!(dev.sampling.sample_interval_ms, 10_000);
        assert_eq!(dev.sampling.avg_samples, 5);
        assert!(dev.take_config_changed());
        assert!(!dev.take_config_changed());
    }

    #[test]
    fn reboot_requires_explicit_confirmation() {
        let mut dev = device();
        dev.handle_message("system/reboot", b"{}", 0, 0);
        assert!(!dev.reboot_requested());
        dev.handle_message("system/reboot", br#"{"confirm":false}"#, 0, 0);
        assert!(!dev.reboot_requested());
        dev.handle_message("system/reboot", br#"{"confirm":true}"#, 0, 0);
        assert!(dev.reboot_requested());
    }

    #[test]
    fn sample_tick_publishes_raw_then_average_on_window_completion() {
        let mut config = DeviceConfig::default();
        config.sampling.avg_samples = 3;
        let mut dev = device_with(
            &config,
            vec![
                reading(20.0, 40.0),
                reading(21.0, 50.0),
                reading(22.0, 60.0),
            ],
        );

        let first = dev.sample_tick(100);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].suffix, "sensor/raw");
        assert!(!first[0].retained);
        assert_eq!(json(&first[0])["temperature"], 20.0);

        dev.sample_tick(200);
        let third = dev.sample_tick(300);
        assert_eq!(third.len(), 2);
        assert_eq!(third[1].suffix, "sensor/avg");
        let avg = json(&third[1]);
        assert_eq!(avg["temp"], 21.0);
        assert_eq!(avg["hum"], 50.0);
        assert_eq!(avg["samples"], 3);
        assert_eq!(avg["timestamp"], 300);

        // window completion resets both buffers
        assert_eq!(dev.temperature.size(), 0);
        assert_eq!(dev.humidity.size(), 0);
    }

    #[test]
    fn failed_reads_skip_telemetry_and_latch_the_fault_indication() {
        let mut dev = device_with(
            &DeviceConfig::default(),
            vec![reading(200.0, 50.0); 5],
        );

        for tick in 0..4 {
            let out = dev.sample_tick(tick);
            assert!(out.is_empty());
            assert!(!dev.sensor.has_persistent_fault());
        }
        assert_eq!(dev.sensor.consecutive_failures(), 4);
        assert_eq!(dev.temperature.size(), 0);

        dev.sample_tick(5);
        assert!(dev.sensor.has_persistent_fault());
        let status = dev.led.status();
        assert_eq!((status.r, status.g, status.b), (255, 0, 0));
    }

    #[test]
    fn heartbeat_reports_uptime_in_seconds() {
        let dev = device();
        let out = dev.heartbeat_tick(125_000, -58, 182_000);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].suffix, "system/heartbeat");
        assert!(!out[0].retained);
        let beat = json(&out[0]);
        assert_eq!(beat["uptime"], 125);
        assert_eq!(beat["wifi_rssi"], -58);
        assert_eq!(beat["free_heap"], 182_000);
    }
}
