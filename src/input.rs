//! Touch input handling.
//!
//! This module provides:
//! - `IrqLatch`, set from the GPIO interrupt when the touch controller
//!   signals new data and consumed by the driver in the main loop
//! - `TouchTracker`, which turns the per-poll touch samples into gestures
//!   (press, drag, tap, swipe)
//!
//! The latch is the only state shared with an interrupt handler and is
//! protected with `critical_section`.

use core::cell::Cell;
use critical_section::Mutex;
use embedded_graphics::prelude::Point;

use crate::config::InputConfig;
use crate::tiles::Dir;
use crate::touch::TouchSample;

// Flag raised by the touch INT line
pub struct IrqLatch {
    flag: Mutex<Cell<bool>>,
}

impl IrqLatch {
    pub const fn new() -> Self {
        Self { flag: Mutex::new(Cell::new(false)) }
    }

    // Called from the interrupt handler
    pub fn set(&self) {
        critical_section::with(|cs| self.flag.borrow(cs).set(true));
    }

    // Read and clear in one go
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.flag.borrow(cs).replace(false))
    }
}

impl Default for IrqLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Gesture {
    /// Finger went down.
    Press(Point),
    /// Finger moved while down.
    Drag(Point),
    /// Short touch that barely moved; carries the press point.
    Tap(Point),
    /// Finger travelled far along one axis; direction of finger motion.
    Swipe(Dir),
    /// Finger lifted after moving, but not far enough for a swipe.
    Release(Point),
}

#[derive(Copy, Clone, Debug)]
struct Contact {
    start: Point,
    last: Point,
    // largest distance from start on either axis
    travel: i32,
    last_seen_ms: u64,
}

/// Gesture recognizer fed with one [`TouchSample`] per poll.
///
/// The controller only reports a point when its interrupt fired, so a held
/// finger shows up as pressed samples with released ones in between. The
/// release is therefore debounced: the contact only ends after no pressed
/// sample arrived for `release_debounce_ms`.
pub struct TouchTracker {
    cfg: InputConfig,
    contact: Option<Contact>,
}

impl TouchTracker {
    pub fn new(cfg: InputConfig) -> Self {
        Self { cfg, contact: None }
    }

    pub fn is_down(&self) -> bool {
        self.contact.is_some()
    }

    pub fn update(&mut self, sample: TouchSample, now_ms: u64) -> Option<Gesture> {
        if sample.pressed {
            let p = sample.point();
            return match self.contact.as_mut() {
                None => {
                    self.contact = Some(Contact { start: p, last: p, travel: 0, last_seen_ms: now_ms });
                    Some(Gesture::Press(p))
                }
                Some(c) => {
                    c.last_seen_ms = now_ms;
                    if p == c.last {
                        return None;
                    }
                    let d = p - c.start;
                    c.travel = c.travel.max(d.x.abs()).max(d.y.abs());
                    c.last = p;
                    Some(Gesture::Drag(p))
                }
            };
        }

        let c = self.contact?;
        if now_ms.saturating_sub(c.last_seen_ms) < self.cfg.release_debounce_ms {
            return None;
        }
        self.contact = None;
        Some(self.classify(&c))
    }

    fn classify(&self, c: &Contact) -> Gesture {
        if c.travel < self.cfg.tap_slop_px {
            return Gesture::Tap(c.start);
        }

        let d = c.last - c.start;
        let (ax, ay) = (d.x.abs(), d.y.abs());
        if ax >= ay && ax >= self.cfg.swipe_min_px {
            Gesture::Swipe(if d.x < 0 { Dir::Left } else { Dir::Right })
        } else if ay > ax && ay >= self.cfg.swipe_min_px {
            Gesture::Swipe(if d.y < 0 { Dir::Up } else { Dir::Down })
        } else {
            Gesture::Release(c.last)
        }
    }
}
