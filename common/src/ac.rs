//! Command controller for the split AC unit.
//!
//! Infrared is one-way: there is no acknowledgment channel, so the state
//! held here is an optimistic mirror of the physical unit. It can diverge
//! permanently (blocked line of sight, unit switched by its own remote)
//! and nothing reconciles it; consumers get the last commanded state.

use crate::ir::{self, AcMode, AcProtocolVariant, FanSpeed, CARRIER_KHZ, TEMP_MAX_C, TEMP_MIN_C};

/// The AC receiver cannot parse back-to-back frames; commands inside this
/// window are rejected outright.
pub const MIN_COMMAND_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcState {
    pub power: bool,
    pub temperature: u8,
    pub mode: AcMode,
    pub fan_speed: FanSpeed,
    pub last_change_ms: Option<u64>,
}

impl Default for AcState {
    fn default() -> Self {
        Self {
            power: false,
            temperature: 24,
            mode: AcMode::Cool,
            fan_speed: FanSpeed::Auto,
            last_change_ms: None,
        }
    }
}

/// A fully rendered transmission: payload bytes for logging/status and
/// the pulse train handed to the transmitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcSignal {
    pub bytes: [u8; 3],
    pub pulses: Vec<u16>,
    pub carrier_khz: u32,
}

#[derive(Debug)]
pub struct AcController {
    state: AcState,
    variant: AcProtocolVariant,
    min_interval_ms: u64,
}

impl AcController {
    pub fn new(variant: AcProtocolVariant) -> Self {
        Self {
            state: AcState::default(),
            variant,
            min_interval_ms: MIN_COMMAND_INTERVAL_MS,
        }
    }

    pub fn state(&self) -> &AcState {
        &self.state
    }

    /// Validates and applies a command, returning the signal to transmit.
    ///
    /// `None` means the rate limiter rejected the command: nothing was
    /// transmitted and the tracked state is untouched. Unrecognized mode
    /// or fan strings keep the previous value in place; the temperature
    /// is clamped to the unit's 17–30 °C range.
    pub fn send_command(
        &mut self,
        power: bool,
        temperature_c: u8,
        mode: &str,
        fan_speed: &str,
        now_ms: u64,
    ) -> Option<AcSignal> {
        if let Some(last) = self.state.last_change_ms {
            if now_ms.saturating_sub(last) < self.min_interval_ms {
                return None;
            }
        }

        if let Some(mode) = AcMode::parse(mode) {
            self.state.mode = mode;
        }
        if let Some(fan) = FanSpeed::parse(fan_speed) {
            self.state.fan_speed = fan;
        }
        self.state.temperature = temperature_c.clamp(TEMP_MIN_C, TEMP_MAX_C);
        self.state.power = power;
        self.state.last_change_ms = Some(now_ms);

        let bytes = ir::build_payload(
            self.state.power,
            self.state.temperature,
            self.state.mode,
            self.state.fan_speed,
        );
        let pulses = match self.variant {
            AcProtocolVariant::MideaComputed => ir::encode_frame(&bytes),
            AcProtocolVariant::RawTable => ir::raw_power_frame(power).to_vec(),
        };

        Some(AcSignal {
            bytes,
            pulses,
            carrier_khz: CARRIER_KHZ,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn controller() -> AcController {
        AcController::new(AcProtocolVariant::MideaComputed)
    }

    #[test]
    fn commands_inside_the_minimum_interval_are_rejected() {
        let mut ac = controller();

        let first = ac.send_command(true, 22, "cool", "high", 1_000);
        assert!(first.is_some());

        // 1999 ms later: rejected, no state change
        let second = ac.send_command(false, 18, "heat", "low", 2_999);
        assert!(second.is_none());
        assert!(ac.state().power);
        assert_eq!(ac.state().temperature, 22);
        assert_eq!(ac.state().mode, AcMode::Cool);
        assert_eq!(ac.state().last_change_ms, Some(1_000));

        // exactly at the interval boundary: accepted
        let third = ac.send_command(false, 18, "heat", "low", 3_000);
        assert!(third.is_some());
        assert!(!ac.state().power);
        assert_eq!(ac.state().last_change_ms, Some(3_000));
    }

    #[test]
    fn first_command_is_never_rate_limited() {
        let mut ac = controller();
        assert!(ac.send_command(true, 24, "cool", "auto", 0).is_some());
    }

    #[test]
    fn unknown_mode_and_fan_keep_previous_values() {
        let mut ac = controller();
        ac.send_command(true, 20, "heat", "medium", 0);

        let signal = ac.send_command(true, 21, "turbo", "whisper", 5_000);
        assert!(signal.is_some());
        assert_eq!(ac.state().mode, AcMode::Heat);
        assert_eq!(ac.state().fan_speed, FanSpeed::Medium);
        assert_eq!(ac.state().temperature, 21);
    }

    #[test]
    fn temperature_is_clamped_into_unit_range() {
        let mut ac = controller();
        ac.send_command(true, 99, "cool", "auto", 0);
        assert_eq!(ac.state().temperature, 30);

        ac.send_command(true, 2, "cool", "auto", 10_000);
        assert_eq!(ac.state().temperature, 17);
    }

    #[test]
    fn accepted_command_renders_documented_signal() {
        let mut ac = controller();
        let signal = ac
            .send_command(true, 22, "cool", "high", 0)
            .expect("accepted");
        assert_eq!(signal.bytes, [0xB2, 0x3F, 0x70]);
        assert_eq!(signal.pulses.len(), 199);
        assert_eq!(signal.carrier_khz, 38);
    }

    #[test]
    fn raw_table_variant_replays_fixed_captures() {
        let mut ac = AcController::new(AcProtocolVariant::RawTable);

        let on = ac.send_command(true, 22, "cool", "high", 0).expect("on");
        assert_eq!(on.pulses.as_slice(), ir::raw_power_frame(true));
        // payload bytes still reflect the tracked state for status reporting
        assert_eq!(on.bytes, [0xB2, 0x3F, 0x70]);

        let off = ac.send_command(false, 22, "cool", "high", 5_000).expect("off");
        assert_eq!(off.pulses.as_slice(), ir::raw_power_frame(false));
    }
}
