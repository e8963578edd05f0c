//! Analog clock hands.
//!
//! Time on the face is device uptime plus a fixed epoch offset; there is no
//! wall clock. Angles are in degrees with 0 pointing up, clockwise.

use core::f32::consts::PI;

use embedded_graphics::{
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
};

use crate::config::ClockConfig;
use crate::framebuffer::Invalidate;

const FACE_COLOR: Rgb565 = Rgb565::new(4, 8, 4); // 0x202020
const HOUR_COLOR: Rgb565 = Rgb565::WHITE;
const MINUTE_COLOR: Rgb565 = Rgb565::new(21, 42, 21); // 0xAAAAAA
const SECOND_COLOR: Rgb565 = Rgb565::new(30, 16, 6); // 0xF44336

const THICK: u32 = 6;
const THIN: u32 = 3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HandAngles {
    pub hour: f32,
    pub minute: f32,
    pub second: f32,
}

impl HandAngles {
    /// Angles after `elapsed_ms` of uptime, starting from `epoch_secs`.
    pub fn at(elapsed_ms: u64, epoch_secs: u32) -> Self {
        let t = elapsed_ms / 1000 + epoch_secs as u64;
        let s = (t % 60) as f32;
        let m = ((t / 60) % 60) as f32;
        let h = ((t / 3600) % 12) as f32;
        Self {
            hour: h * 30.0 + m * 0.5,
            minute: m * 6.0 + s * 0.1,
            second: s * 6.0,
        }
    }
}

/// Two-point segment of one hand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HandGeometry {
    pub origin: Point,
    pub end: Point,
}

impl HandGeometry {
    pub fn from_angle(center: Point, angle_deg: f32, length: i32) -> Self {
        let rad = (angle_deg - 90.0) * PI / 180.0;
        let len = length as f32;
        // `as` truncates toward zero
        let dx = (libm::cosf(rad) * len) as i32;
        let dy = (libm::sinf(rad) * len) as i32;
        Self {
            origin: center,
            end: center + Point::new(dx, dy),
        }
    }

    /// Screen area the stroked segment can touch.
    pub fn bounding_box(&self, stroke: u32) -> Rectangle {
        Rectangle::with_corners(self.origin, self.end).offset(stroke as i32 / 2 + 1)
    }
}

#[derive(Copy, Clone, Debug)]
struct Hand {
    geom: HandGeometry,
    length: i32,
    stroke: u32,
    color: Rgb565,
}

impl Hand {
    fn new(center: Point, length: i32, stroke: u32, color: Rgb565) -> Self {
        Self {
            geom: HandGeometry::from_angle(center, 0.0, length),
            length,
            stroke,
            color,
        }
    }

    // Old area invalid before the move, new area after.
    fn point_to(&mut self, center: Point, angle: f32, inv: &mut impl Invalidate) -> bool {
        let next = HandGeometry::from_angle(center, angle, self.length);
        if next == self.geom {
            return false;
        }
        inv.invalidate(self.geom.bounding_box(self.stroke));
        self.geom = next;
        inv.invalidate(self.geom.bounding_box(self.stroke));
        true
    }

    fn draw<D: DrawTarget<Color = Rgb565>>(&self, target: &mut D) -> Result<(), D::Error> {
        Line::new(self.geom.origin, self.geom.end)
            .into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke))
            .draw(target)
    }
}

/// Result of one clock tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClockTick {
    pub angles: HandAngles,
    /// Whole displayed seconds, set when a new second started with this tick.
    pub new_second: Option<u64>,
}

pub struct AnalogClock {
    cfg: ClockConfig,
    hour: Hand,
    minute: Hand,
    second: Hand,
    last_second: Option<u64>,
}

impl AnalogClock {
    pub fn new(cfg: ClockConfig) -> Self {
        let c = cfg.center;
        let r = cfg.radius;
        Self {
            cfg,
            hour: Hand::new(c, r - 40, THICK, HOUR_COLOR),
            minute: Hand::new(c, r - 20, THICK, MINUTE_COLOR),
            second: Hand::new(c, r - 10, THIN, SECOND_COLOR),
            last_second: None,
        }
    }

    pub fn hour(&self) -> HandGeometry {
        self.hour.geom
    }

    pub fn minute(&self) -> HandGeometry {
        self.minute.geom
    }

    pub fn second(&self) -> HandGeometry {
        self.second.geom
    }

    /// Move the hands to `elapsed_ms` and invalidate what changed.
    pub fn update(&mut self, elapsed_ms: u64, inv: &mut impl Invalidate) -> ClockTick {
        let angles = HandAngles::at(elapsed_ms, self.cfg.epoch_secs);
        let c = self.cfg.center;
        self.second.point_to(c, angles.second, inv);
        self.minute.point_to(c, angles.minute, inv);
        self.hour.point_to(c, angles.hour, inv);

        let secs = elapsed_ms / 1000 + self.cfg.epoch_secs as u64;
        let new_second = if self.last_second != Some(secs) {
            self.last_second = Some(secs);
            Some(secs)
        } else {
            None
        };
        ClockTick { angles, new_second }
    }

    /// Face and hands, in tile coordinates.
    pub fn draw<D: DrawTarget<Color = Rgb565>>(&self, target: &mut D) -> Result<(), D::Error> {
        Circle::with_center(self.cfg.center, (self.cfg.radius * 2) as u32)
            .into_styled(PrimitiveStyle::with_fill(FACE_COLOR))
            .draw(target)?;
        self.hour.draw(target)?;
        self.minute.draw(target)?;
        self.second.draw(target)
    }
}
