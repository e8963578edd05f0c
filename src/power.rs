//! Backlight power controller.
//!
//! Two states, on and off. Switching is done in place with a blocking fade:
//!
//! - wake:  sleep-out, display-on, settle delay, fade 0 -> target
//! - sleep: fade current -> 0, display-off, sleep-in
//!
//! The panel has to be awake before the light comes up and the light has to
//! be gone before the panel goes dark, otherwise the panel flashes.
//!
//! A fade stalls the main loop: at most `ceil(255 / step)` writes spaced by
//! the fade interval, about 130 ms with the defaults. No touch polling or
//! timers run in that window.

use core::fmt;
use core::iter::Peekable;

use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};
use log::{info, warn};

use crate::backlight::Backlight;
use crate::config::BacklightConfig;
use crate::panel::PanelPower;
use crate::touch::ActivitySink;

/// Brightness levels of one fade, ending exactly on the target.
///
/// Moves by `step` while more than one step away, then snaps to `end`.
#[derive(Clone, Debug)]
pub struct FadeRamp {
    cur: i16,
    end: i16,
    step: i16,
    done: bool,
}

impl FadeRamp {
    pub fn new(start: u8, end: u8, step: u8) -> Self {
        let step = step.max(1) as i16;
        Self {
            cur: start as i16,
            end: end as i16,
            step: if start < end { step } else { -step },
            done: false,
        }
    }
}

impl Iterator for FadeRamp {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        if (self.cur - self.end).abs() > self.step.abs() {
            self.cur += self.step;
        } else {
            self.cur = self.end;
            self.done = true;
        }
        Some(self.cur as u8)
    }
}

/// Snapshot of the controller state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BacklightState {
    pub is_display_on: bool,
    pub target_brightness: u8,
    pub current_brightness: u8,
    pub last_activity_ms: u64,
    pub display_wake_ms: u64,
}

pub struct PowerController<P, D> {
    backlight: Backlight<P>,
    delay: D,
    cfg: BacklightConfig,
    on: bool,
    target: u8,
    last_activity_ms: u64,
    wake_ms: u64,
}

fn log_panel_err<E: fmt::Debug>(what: &str, r: Result<(), E>) {
    if let Err(e) = r {
        warn!("panel {} failed: {:?}", what, e);
    }
}

impl<P: SetDutyCycle, D: DelayNs> PowerController<P, D> {
    /// Takes over the backlight pin and switches it on at the initial level.
    /// The panel is assumed awake (it just went through init).
    pub fn new(pwm: P, delay: D, cfg: BacklightConfig, now_ms: u64) -> Self {
        let mut backlight = Backlight::new(pwm, cfg.polarity);
        backlight.write_level(cfg.initial_brightness);
        Self {
            backlight,
            delay,
            cfg,
            on: true,
            target: cfg.initial_brightness,
            last_activity_ms: now_ms,
            wake_ms: now_ms,
        }
    }

    pub fn is_display_on(&self) -> bool {
        self.on
    }

    pub fn target_brightness(&self) -> u8 {
        self.target
    }

    /// Logical level, independent of pin polarity.
    pub fn current_brightness(&self) -> u8 {
        self.backlight.level()
    }

    pub fn state(&self) -> BacklightState {
        BacklightState {
            is_display_on: self.on,
            target_brightness: self.target,
            current_brightness: self.backlight.level(),
            last_activity_ms: self.last_activity_ms,
            display_wake_ms: self.wake_ms,
        }
    }

    pub fn record_activity(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    /// Switch the display. No-op when already in the requested state.
    pub fn set_display_state(&mut self, on: bool, now_ms: u64, panel: &mut impl PanelPower) {
        if self.on == on {
            return;
        }
        self.on = on;

        if on {
            self.wake_ms = now_ms;
            log_panel_err("sleep-out", panel.sleep_out());
            log_panel_err("display-on", panel.display_on());
            self.delay.delay_ms(self.cfg.wake_settle_ms);
            self.fade(true);
            info!("display on, brightness {}", self.target);
        } else {
            self.fade(false);
            log_panel_err("display-off", panel.display_off());
            log_panel_err("sleep-in", panel.sleep_in());
            info!("display off");
        }
    }

    /// Blocking ramp from the current level toward the target (in) or 0 (out).
    pub fn fade(&mut self, fade_in: bool) {
        let end = if fade_in { self.target } else { 0 };
        let mut ramp: Peekable<FadeRamp> =
            FadeRamp::new(self.backlight.level(), end, self.cfg.fade_step).peekable();

        while let Some(level) = ramp.next() {
            self.backlight.write_level(level);
            if ramp.peek().is_some() {
                self.delay.delay_ms(self.cfg.fade_interval_ms);
            }
        }
    }

    /// New user brightness; applied at once (no fade) while the display is on.
    pub fn set_user_brightness(&mut self, level: u8) {
        self.target = level;
        if self.on {
            self.backlight.write_level(level);
        }
    }

    /// Inactivity policy, once per main-loop step. Returns true when the
    /// display was switched off.
    pub fn tick(&mut self, now_ms: u64, panel: &mut impl PanelPower) -> bool {
        if !self.cfg.power_management || !self.on {
            return false;
        }
        let idle = now_ms.saturating_sub(self.last_activity_ms);
        let awake = now_ms.saturating_sub(self.wake_ms);
        if idle > self.cfg.inactivity_timeout_ms && awake > self.cfg.inactivity_timeout_ms {
            self.set_display_state(false, now_ms, panel);
            return true;
        }
        false
    }

    pub fn release(self) -> (P, D) {
        (self.backlight.into_inner(), self.delay)
    }
}

/// Activity sink for the touch poll: records activity and wakes a dark
/// display right away. Lives for one poll.
pub struct WakeOnTouch<'a, P, D, L> {
    pub power: &'a mut PowerController<P, D>,
    pub panel: &'a mut L,
}

impl<P: SetDutyCycle, D: DelayNs, L: PanelPower> ActivitySink for WakeOnTouch<'_, P, D, L> {
    fn record_activity(&mut self, now_ms: u64) {
        self.power.record_activity(now_ms);
        if !self.power.is_display_on() {
            self.power.set_display_state(true, now_ms, self.panel);
        }
    }
}
