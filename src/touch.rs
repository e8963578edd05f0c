//! Touch source adapter.
//!
//! Turns whatever the touch controller reports into one [`TouchSample`] per
//! main-loop poll. A pressed sample is reported to the [`ActivitySink`]
//! before it is returned, so a touch on a dark screen wakes the panel in the
//! same cycle the touch is seen.

use core::fmt;

use embedded_graphics::prelude::Point;
use log::{info, warn};

/// One poll result. Consumed immediately by the gesture layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TouchSample {
    pub pressed: bool,
    pub x: i32,
    pub y: i32,
}

impl TouchSample {
    pub const RELEASED: Self = Self { pressed: false, x: 0, y: 0 };

    pub fn pressed_at(p: Point) -> Self {
        Self { pressed: true, x: p.x, y: p.y }
    }

    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Polling contract of a capacitive touch controller.
pub trait TouchController {
    type Error: fmt::Debug;

    /// True when a finger is down and a fresh point was latched.
    fn available(&mut self) -> Result<bool, Self::Error>;

    /// Coordinates of the point latched by the last successful `available`.
    fn last_point(&self) -> Point;
}

/// Receives user activity (wake + inactivity timer reset).
pub trait ActivitySink {
    fn record_activity(&mut self, now_ms: u64);
}

/// Discards activity; used when power management is compiled out.
pub struct NoActivity;

impl ActivitySink for NoActivity {
    fn record_activity(&mut self, _now_ms: u64) {}
}

pub struct TouchSource<T> {
    ctrl: T,
    read_errors: u32,
    // last read failed; cleared by the next good one
    failing: bool,
}

impl<T: TouchController> TouchSource<T> {
    pub fn new(ctrl: T) -> Self {
        Self { ctrl, read_errors: 0, failing: false }
    }

    /// Wrap a controller whose bring-up may have failed. The controller is
    /// kept and polled anyway: a chip that missed its init still answers
    /// reads once the bus recovers, and a failed read only costs one cycle.
    pub fn from_init<E: fmt::Debug>(ctrl: T, init: Result<(), E>) -> Self {
        if let Err(e) = init {
            warn!("touch controller init failed, polling anyway: {:?}", e);
        }
        Self::new(ctrl)
    }

    /// Bus errors seen since start-up.
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }

    /// Poll the controller once. Never blocks.
    ///
    /// Read errors count as "released" for this cycle.
    pub fn poll(&mut self, now_ms: u64, activity: &mut impl ActivitySink) -> TouchSample {
        let sample = match self.ctrl.available() {
            Ok(pressed) => {
                if self.failing {
                    info!("touch reads recovered after {} errors", self.read_errors);
                    self.failing = false;
                }
                if pressed {
                    TouchSample::pressed_at(self.ctrl.last_point())
                } else {
                    TouchSample::RELEASED
                }
            }
            Err(e) => {
                // once per fault, a loose flex cable would flood the log
                if !self.failing {
                    warn!("touch read failed: {:?}", e);
                    self.failing = true;
                }
                self.read_errors = self.read_errors.saturating_add(1);
                TouchSample::RELEASED
            }
        };

        if sample.pressed {
            activity.record_activity(now_ms);
        }
        sample
    }
}
