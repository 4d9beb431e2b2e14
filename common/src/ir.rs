//! Infrared command encoder for Midea-style split air conditioners.
//!
//! A command is packed into three payload bytes, each transmitted followed
//! by its bitwise complement (MSB first), framed by a header mark/space
//! pair and a trailing stop mark. The whole frame goes out twice with a
//! header-width gap between repetitions so the receiver can survive a
//! noisy first pass. Timings are multiples of a 553 µs unit on a 38 kHz
//! carrier.

use serde::{Deserialize, Serialize};

use crate::ir_codes;

pub const CARRIER_KHZ: u32 = 38;

pub const TEMP_MIN_C: u8 = 17;
pub const TEMP_MAX_C: u8 = 30;

const T_UNIT_US: u16 = 553;
const HEADER_MARK_US: u16 = T_UNIT_US * 8;
const HEADER_SPACE_US: u16 = T_UNIT_US * 8;
const BIT_MARK_US: u16 = T_UNIT_US;
const ONE_SPACE_US: u16 = T_UNIT_US * 3;
const ZERO_SPACE_US: u16 = T_UNIT_US;
const FRAME_REPEATS: usize = 2;

const FRAME_MAGIC: u8 = 0xB2;
const STATE_ON_NIBBLE: u8 = 0b1111;
const STATE_OFF_NIBBLE: u8 = 0b1011;
const TEMP_OFF_NIBBLE: u8 = 0b1110;

/// Temperature nibbles for 17..=30 °C. The sequence is a capture of the
/// remote's wire format, not a binary count; index with `temp - 17`.
const TEMP_NIBBLES: [u8; 14] = [
    0b0000, // 17
    0b0001, // 18
    0b0011, // 19
    0b0010, // 20
    0b0110, // 21
    0b0111, // 22
    0b0101, // 23
    0b0100, // 24
    0b1100, // 25
    0b1101, // 26
    0b1001, // 27
    0b1000, // 28
    0b1010, // 29
    0b1011, // 30
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcMode {
    Cool,
    Heat,
    Auto,
    Fan,
    Dry,
}

impl AcMode {
    pub fn nibble(self) -> u8 {
        match self {
            Self::Cool => 0b0000,
            Self::Heat => 0b1100,
            Self::Auto => 0b1000,
            Self::Fan => 0b0100,
            Self::Dry => 0b0010,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cool => "cool",
            Self::Heat => "heat",
            Self::Auto => "auto",
            Self::Fan => "fan",
            Self::Dry => "dry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "cool" => Some(Self::Cool),
            "heat" => Some(Self::Heat),
            "auto" => Some(Self::Auto),
            "fan" => Some(Self::Fan),
            "dry" => Some(Self::Dry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanSpeed {
    Auto,
    Low,
    Medium,
    High,
}

impl FanSpeed {
    pub fn nibble(self) -> u8 {
        match self {
            Self::Auto => 0b1011,
            Self::Low => 0b1001,
            Self::Medium => 0b0101,
            Self::High => 0b0011,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Which encoder drives the transmitter. `MideaComputed` is canonical;
/// `RawTable` replays fixed captures that only cover the power toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcProtocolVariant {
    RawTable,
    #[default]
    MideaComputed,
}

pub fn temperature_nibble(temperature_c: u8) -> u8 {
    let index = temperature_c.clamp(TEMP_MIN_C, TEMP_MAX_C) - TEMP_MIN_C;
    TEMP_NIBBLES[index as usize]
}

/// Packs a command into the three-byte payload.
///
/// Powering off overrides the requested temperature with the dedicated
/// off nibble; the receiver rejects off frames carrying a setpoint.
pub fn build_payload(power: bool, temperature_c: u8, mode: AcMode, fan: FanSpeed) -> [u8; 3] {
    let state = if power {
        STATE_ON_NIBBLE
    } else {
        STATE_OFF_NIBBLE
    };
    let temp = if power {
        temperature_nibble(temperature_c)
    } else {
        TEMP_OFF_NIBBLE
    };
    [
        FRAME_MAGIC,
        (fan.nibble() << 4) | state,
        (temp << 4) | mode.nibble(),
    ]
}

/// Renders the payload as alternating mark/space durations in µs.
///
/// Per repetition: header (2 cells) + 3 bytes × 2 halves × 8 bits × 2
/// cells + stop mark (1 cell) = 99 cells; two repetitions joined by one
/// header-width gap cell give 199 cells total.
pub fn encode_frame(payload: &[u8; 3]) -> Vec<u16> {
    let mut pulses = Vec::with_capacity(199);
    for repeat in 0..FRAME_REPEATS {
        pulses.push(HEADER_MARK_US);
        pulses.push(HEADER_SPACE_US);
        for &byte in payload {
            push_byte(&mut pulses, byte);
            push_byte(&mut pulses, !byte);
        }
        pulses.push(BIT_MARK_US);
        if repeat + 1 < FRAME_REPEATS {
            pulses.push(HEADER_SPACE_US);
        }
    }
    pulses
}

/// Fixed capture for the legacy raw-table variant.
pub fn raw_power_frame(power: bool) -> &'static [u16] {
    if power {
        ir_codes::RAW_POWER_ON
    } else {
        ir_codes::RAW_POWER_OFF
    }
}

fn push_byte(pulses: &mut Vec<u16>, byte: u8) {
    for bit in (0..8).rev() {
        pulses.push(BIT_MARK_US);
        pulses.push(if byte & (1 << bit) != 0 {
            ONE_SPACE_US
        } else {
            ZERO_SPACE_US
        });
    }
}
