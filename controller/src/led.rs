//! RGB status LED.
//!
//! Colour state lives here; the LEDC PWM channels attach in
//! [`RgbLed::write_output`] on the esp target. Blink feedback runs as a
//! deadline state machine advanced from the main loop instead of a
//! blocking delay sequence.

use tracing::trace;

use aircon_common::types::LedStatusPayload;

pub const COLOR_RED: (u8, u8, u8) = (255, 0, 0);
pub const COLOR_GREEN: (u8, u8, u8) = (0, 255, 0);
pub const COLOR_BLUE: (u8, u8, u8) = (0, 0, 255);
pub const COLOR_YELLOW: (u8, u8, u8) = (255, 255, 0);

const BLINK_PHASE_MS: u64 = 200;
const BLINK_TIMES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlinkPhase {
    Pending,
    Due,
    Done,
}

/// One lit-dark cycle per `times`, toggling at every deadline.
#[derive(Debug)]
struct Blink {
    color: (u8, u8, u8),
    phases_left: u8,
    next_at_ms: u64,
    lit: bool,
}

impl Blink {
    fn new(color: (u8, u8, u8), times: u8, now_ms: u64) -> Self {
        Self {
            color,
            phases_left: times * 2,
            next_at_ms: now_ms,
            lit: false,
        }
    }

    fn phase(&self, now_ms: u64) -> BlinkPhase {
        if self.phases_left == 0 {
            BlinkPhase::Done
        } else if now_ms >= self.next_at_ms {
            BlinkPhase::Due
        } else {
            BlinkPhase::Pending
        }
    }
}

pub struct RgbLed {
    r: u8,
    g: u8,
    b: u8,
    enabled: bool,
    blink: Option<Blink>,
}

impl RgbLed {
    pub fn new() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            enabled: true,
            blink: None,
        }
    }

    /// Remote `led/command` application; cancels any running blink so the
    /// commanded colour is what stays visible.
    pub fn apply(&mut self, r: u8, g: u8, b: u8, enabled: bool) {
        self.blink = None;
        self.r = r;
        self.g = g;
        self.b = b;
        self.enabled = enabled;
        self.write_output();
    }

    pub fn set_color(&mut self, (r, g, b): (u8, u8, u8)) {
        self.r = r;
        self.g = g;
        self.b = b;
        if self.blink.is_none() {
            self.write_output();
        }
    }

    /// Ambient temperature indication used after each sensor poll.
    pub fn show_temperature(&mut self, temperature_c: f32) {
        let color = if temperature_c < 20.0 {
            COLOR_BLUE
        } else if temperature_c < 25.0 {
            COLOR_GREEN
        } else if temperature_c < 30.0 {
            COLOR_YELLOW
        } else {
            COLOR_RED
        };
        self.set_color(color);
    }

    pub fn show_fault(&mut self) {
        self.set_color(COLOR_RED);
    }

    pub fn start_blink(&mut self, color: (u8, u8, u8), now_ms: u64) {
        self.blink = Some(Blink::new(color, BLINK_TIMES, now_ms));
    }

    /// Advances the blink machine; call once per loop iteration. Restores
    /// the steady colour when the sequence finishes.
    pub fn advance(&mut self, now_ms: u64) {
        let Some(blink) = &mut self.blink else {
            return;
        };
        match blink.phase(now_ms) {
            BlinkPhase::Pending => {}
            BlinkPhase::Due => {
                blink.lit = !blink.lit;
                blink.phases_left -= 1;
                blink.next_at_ms = now_ms + BLINK_PHASE_MS;
                self.write_output();
            }
            BlinkPhase::Done => {
                self.blink = None;
                self.write_output();
            }
        }
    }

    pub fn status(&self) -> LedStatusPayload {
        LedStatusPayload {
            r: self.r,
            g: self.g,
            b: self.b,
            enabled: self.enabled,
        }
    }

    /// Duty cycle currently on the pins: dark when disabled, the blink
    /// colour while a sequence runs, the steady colour otherwise.
    fn output(&self) -> (u8, u8, u8) {
        if !self.enabled {
            return (0, 0, 0);
        }
        match &self.blink {
            Some(blink) if blink.lit => blink.color,
            Some(_) => (0, 0, 0),
            None => (self.r, self.g, self.b),
        }
    }

    fn write_output(&self) {
        let (r, g, b) = self.output();
        // Hardware integration point:
        // the LEDC PWM channels take these duty values on the esp target.
        trace!(r, g, b, "led output");
    }
}
