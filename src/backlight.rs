//! Display backlight output.
//!
//! The LED driver sits behind a single PWM pin. Callers always speak in
//! logical levels (0 = dark, 255 = full); the polarity setting flips the raw
//! duty for boards whose driver is active-low.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::config::MAX_BRIGHTNESS;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Raw 8-bit duty for a logical level.
    #[inline]
    pub fn raw(self, level: u8) -> u8 {
        match self {
            Polarity::ActiveHigh => level,
            Polarity::ActiveLow => MAX_BRIGHTNESS - level,
        }
    }
}

/// Controls the display backlight LED.
pub struct Backlight<P> {
    pwm: P,
    polarity: Polarity,
    level: u8,
}

impl<P: SetDutyCycle> Backlight<P> {
    pub fn new(pwm: P, polarity: Polarity) -> Self {
        Self { pwm, polarity, level: 0 }
    }

    /// Write a logical level straight to the pin. Errors are logged and dropped.
    pub fn write_level(&mut self, level: u8) {
        let raw = self.polarity.raw(level);
        if let Err(e) = self.pwm.set_duty_cycle_fraction(raw as u16, MAX_BRIGHTNESS as u16) {
            warn!("backlight pwm write failed: {:?}", e);
        }
        self.level = level;
    }

    /// Last logical level written.
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_on(&self) -> bool {
        self.level > 0
    }

    pub fn into_inner(self) -> P {
        self.pwm
    }
}
