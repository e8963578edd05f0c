//! Dashboard: tile navigation, periodic content refresh and the scene the
//! framebuffer renders.
//!
//! Two timers drive content. The fast one moves the clock hands and, once
//! per displayed second, updates the simulated metrics. The slow one rotates
//! the departure board. They touch disjoint widgets and never coordinate.

use embedded_graphics::{
    draw_target::DrawTargetExt,
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{ContainsPoint, Rectangle},
};
use log::{debug, info};

use crate::clock::AnalogClock;
use crate::config::{Config, DashboardConfig, TopTile, SCREEN_SIZE};
use crate::flight::FlightBoard;
use crate::framebuffer::{Invalidate, Scene};
use crate::input::Gesture;
use crate::metrics::SimulatedMetrics;
use crate::scheduler::{Scheduler, SchedulerError, TapRegistry, TimerHandle};
use crate::tiles::{self, TileId, TileKind, Tileview, TILES};
use crate::ui;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DashTask {
    Clock,
    Flight,
}

/// Something the rest of the firmware has to act on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DashboardEvent {
    BrightnessChanged(u8),
    Navigated(TileId),
}

// Invalidate in tile coordinates, forwarded in screen coordinates.
struct Shifted<'a, I> {
    inner: &'a mut I,
    by: Point,
}

impl<I: Invalidate> Invalidate for Shifted<'_, I> {
    fn invalidate(&mut self, area: Rectangle) {
        self.inner.invalidate(area.translate(self.by));
    }
}

pub struct Dashboard {
    cfg: DashboardConfig,
    view: Tileview,
    clock: AnalogClock,
    metrics: SimulatedMetrics,
    flights: FlightBoard,
    brightness: u8,
    slider_held: bool,
    timers: Scheduler<DashTask, 4>,
    taps: TapRegistry<TileId, 4>,
    flight_timer: Option<TimerHandle>,
}

impl Dashboard {
    pub fn new(cfg: &Config, now_ms: u64) -> Result<Self, SchedulerError> {
        let dash = cfg.dashboard;

        let mut taps = TapRegistry::new();
        taps.register(ui::HR_AREA, tiles::RIGHT)?;
        taps.register(ui::BATTERY_AREA, tiles::LEFT)?;
        taps.register(ui::STEPS_AREA, tiles::BOTTOM)?;

        let mut timers = Scheduler::new();
        timers.register_periodic(DashTask::Clock, dash.clock_period_ms, now_ms)?;
        let flight_timer = match dash.top_tile {
            TopTile::FlightBoard => {
                Some(timers.register_periodic(DashTask::Flight, dash.flight_period_ms, now_ms)?)
            }
            TopTile::Settings => None,
        };

        info!("dashboard up, top tile {:?}", dash.top_tile);
        Ok(Self {
            cfg: dash,
            view: Tileview::new(tiles::CENTER, dash.slide_duration_ms),
            clock: AnalogClock::new(cfg.clock),
            metrics: SimulatedMetrics::new(dash.rng_seed),
            flights: FlightBoard::new(),
            brightness: cfg.backlight.initial_brightness,
            slider_held: false,
            timers,
            taps,
            flight_timer,
        })
    }

    pub fn active_tile(&self) -> TileId {
        self.view.active()
    }

    pub fn is_animating(&self) -> bool {
        self.view.is_animating()
    }

    pub fn clock(&self) -> &AnalogClock {
        &self.clock
    }

    pub fn metrics(&self) -> &SimulatedMetrics {
        &self.metrics
    }

    pub fn flights(&self) -> &FlightBoard {
        &self.flights
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn top_tile(&self) -> TopTile {
        self.cfg.top_tile
    }

    /// Swap what the top tile shows. The departure board brings its rotation
    /// timer along; settings has none.
    pub fn set_top_tile(&mut self, top: TopTile, now_ms: u64) -> Result<(), SchedulerError> {
        if top == self.cfg.top_tile {
            return Ok(());
        }
        if let Some(h) = self.flight_timer.take() {
            self.timers.cancel(h);
        }
        if top == TopTile::FlightBoard {
            self.flight_timer =
                Some(self.timers.register_periodic(DashTask::Flight, self.cfg.flight_period_ms, now_ms)?);
        }
        self.slider_held = false;
        self.cfg.top_tile = top;
        Ok(())
    }

    // Screen offset of a tile at the current viewport position.
    fn shift(&self, tile: TileId) -> Point {
        tile.origin() - self.view.offset()
    }

    fn invalidate_on(&self, tile: TileId, area: Rectangle, inv: &mut impl Invalidate) {
        inv.invalidate(area.translate(self.shift(tile)));
    }

    /// Slide to `to`.
    pub fn navigate(&mut self, to: TileId, now_ms: u64, inv: &mut impl Invalidate) -> bool {
        if tiles::tile(to).is_none() || !self.view.set_tile(to, true, now_ms) {
            return false;
        }
        info!("navigate to ({},{})", to.col, to.row);
        inv.invalidate(Rectangle::new(Point::zero(), SCREEN_SIZE));
        true
    }

    fn set_slider(&mut self, x: i32, inv: &mut impl Invalidate) -> Option<DashboardEvent> {
        let v = ui::slider_value_at(x);
        if v == self.brightness {
            return None;
        }
        self.brightness = v;
        self.invalidate_on(tiles::TOP, ui::SLIDER_DIRTY, inv);
        debug!("brightness slider {}", v);
        Some(DashboardEvent::BrightnessChanged(v))
    }

    fn slider_live(&self) -> bool {
        self.cfg.top_tile == TopTile::Settings && self.view.active() == tiles::TOP
    }

    /// Feed one recognized gesture (screen coordinates).
    pub fn handle_gesture(
        &mut self,
        g: Gesture,
        now_ms: u64,
        inv: &mut impl Invalidate,
    ) -> Option<DashboardEvent> {
        // touches land on whatever is under the finger once the slide settles
        if self.view.is_animating() {
            return None;
        }
        let active = self.view.active();

        match g {
            Gesture::Press(p) if self.slider_live() && ui::SLIDER_HIT.contains(p) => {
                self.slider_held = true;
                self.set_slider(p.x, inv)
            }
            Gesture::Drag(p) if self.slider_held => self.set_slider(p.x, inv),
            Gesture::Press(_) | Gesture::Drag(_) => None,
            Gesture::Tap(p) => {
                if core::mem::take(&mut self.slider_held) || active != tiles::CENTER {
                    return None;
                }
                let to = self.taps.hit(p)?;
                self.navigate(to, now_ms, inv)
                    .then_some(DashboardEvent::Navigated(to))
            }
            Gesture::Swipe(finger) => {
                if core::mem::take(&mut self.slider_held) {
                    return None;
                }
                // content follows the finger, the view moves the other way
                let to = tiles::neighbor(active, finger.opposite())?;
                self.navigate(to, now_ms, inv)
                    .then_some(DashboardEvent::Navigated(to))
            }
            Gesture::Release(_) => {
                self.slider_held = false;
                None
            }
        }
    }

    /// Run due timers.
    pub fn run_timers(&mut self, now_ms: u64, inv: &mut impl Invalidate) {
        let mut due: heapless::Vec<DashTask, 4> = heapless::Vec::new();
        self.timers.fire_due(now_ms, |t| {
            let _ = due.push(t);
        });
        for task in due {
            match task {
                DashTask::Clock => self.on_clock(now_ms, inv),
                DashTask::Flight => self.on_flight(inv),
            }
        }
    }

    fn on_clock(&mut self, now_ms: u64, inv: &mut impl Invalidate) {
        let by = self.shift(tiles::CENTER);
        let tick = self.clock.update(now_ms, &mut Shifted { inner: &mut *inv, by });

        if let Some(second) = tick.new_second {
            self.metrics.on_second(second);
            for area in [ui::HR_AREA, ui::BATTERY_AREA, ui::STEPS_AREA] {
                self.invalidate_on(tiles::CENTER, area, inv);
            }
        }
    }

    fn on_flight(&mut self, inv: &mut impl Invalidate) {
        let rec = self.flights.advance();
        debug!("flight board -> {} {}", rec.time, rec.destination);
        self.invalidate_on(tiles::TOP, ui::FLIGHT_FIELDS, inv);
    }

    /// Advance the slide animation, invalidating the screen when it moved.
    pub fn animate(&mut self, now_ms: u64, inv: &mut impl Invalidate) {
        if self.view.advance(now_ms) {
            inv.invalidate(Rectangle::new(Point::zero(), SCREEN_SIZE));
        }
    }

    fn draw_tile<D>(&self, kind: TileKind, target: &mut D)
    where
        D: DrawTarget<Color = Rgb565>,
    {
        match kind {
            TileKind::Dashboard => ui::draw_dashboard(target, &self.clock, &self.metrics),
            TileKind::Top => match self.cfg.top_tile {
                TopTile::Settings => ui::draw_settings(target, self.brightness),
                TopTile::FlightBoard => {
                    ui::draw_flight_board(target, self.flights.index(), self.flights.current())
                }
            },
            detail => ui::draw_detail(target, detail),
        }
    }
}

impl Scene for Dashboard {
    fn draw<D>(&self, target: &mut D)
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let screen = Rectangle::new(Point::zero(), SCREEN_SIZE);
        target.clear(Rgb565::BLACK).ok();

        for t in TILES.iter() {
            let shift = self.shift(t.id);
            if screen.intersection(&Rectangle::new(shift, SCREEN_SIZE)).is_zero_sized() {
                continue;
            }
            self.draw_tile(t.kind, &mut target.translated(shift));
        }
    }
}
