//! One cooperative main-loop step.
//!
//! Order inside a step:
//! 1. poll touch (a press records activity and wakes the display)
//! 2. feed the gesture recognizer and the dashboard
//! 3. run due timers
//! 4. advance the tile slide
//! 5. render and flush dirty bands
//! 6. evaluate inactivity
//!
//! The caller sleeps between steps; the only thing that blocks inside a step
//! is a backlight fade.

use core::fmt;

use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};
use log::info;

use crate::config::{Config, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::dashboard::{Dashboard, DashboardEvent};
use crate::framebuffer::{FlushSink, FrameBuffer, FrameBufferError, RefreshReport};
use crate::input::{Gesture, TouchTracker};
use crate::panel::PanelPower;
use crate::power::{PowerController, WakeOnTouch};
use crate::scheduler::SchedulerError;
use crate::touch::{NoActivity, TouchController, TouchSample, TouchSource};

#[derive(Debug, PartialEq, Eq)]
pub enum AppError {
    FrameBuffer(FrameBufferError),
    Scheduler(SchedulerError),
}

impl From<FrameBufferError> for AppError {
    fn from(e: FrameBufferError) -> Self {
        AppError::FrameBuffer(e)
    }
}

impl From<SchedulerError> for AppError {
    fn from(e: SchedulerError) -> Self {
        AppError::Scheduler(e)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::FrameBuffer(e) => write!(f, "{}", e),
            AppError::Scheduler(e) => write!(f, "timer setup: {}", e),
        }
    }
}

/// What happened in one step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub touch: TouchSample,
    pub gesture: Option<Gesture>,
    pub event: Option<DashboardEvent>,
    pub refresh: RefreshReport,
    pub slept: bool,
}

pub struct App<'fb, L, T, P, D> {
    cfg: Config,
    panel: L,
    fb: FrameBuffer<'fb>,
    touch: TouchSource<T>,
    tracker: TouchTracker,
    power: PowerController<P, D>,
    dashboard: Dashboard,
}

impl<'fb, L, T, P, D> App<'fb, L, T, P, D>
where
    L: PanelPower + FlushSink,
    T: TouchController,
    P: SetDutyCycle,
    D: DelayNs,
{
    /// `fb` must hold one full screen of pixels.
    pub fn new(
        cfg: Config,
        panel: L,
        fb: &'fb mut [u16],
        touch: TouchSource<T>,
        pwm: P,
        delay: D,
        now_ms: u64,
    ) -> Result<Self, AppError> {
        let fb = FrameBuffer::new(fb, SCREEN_WIDTH, SCREEN_HEIGHT)?;
        let dashboard = Dashboard::new(&cfg, now_ms)?;
        let power = PowerController::new(pwm, delay, cfg.backlight, now_ms);

        info!(
            "app ready, power management {}",
            if cfg.backlight.power_management { "on" } else { "off" }
        );
        Ok(Self {
            cfg,
            panel,
            fb,
            touch,
            tracker: TouchTracker::new(cfg.input),
            power,
            dashboard,
        })
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn power(&self) -> &PowerController<P, D> {
        &self.power
    }

    pub fn panel(&self) -> &L {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut L {
        &mut self.panel
    }

    pub fn framebuffer(&self) -> &FrameBuffer<'fb> {
        &self.fb
    }

    pub fn step(&mut self, now_ms: u64) -> StepReport {
        let mut report = StepReport::default();

        // 1. touch; wake happens inside the poll
        report.touch = if self.cfg.backlight.power_management {
            self.touch.poll(
                now_ms,
                &mut WakeOnTouch { power: &mut self.power, panel: &mut self.panel },
            )
        } else {
            self.touch.poll(now_ms, &mut NoActivity)
        };

        // 2. gestures
        report.gesture = self.tracker.update(report.touch, now_ms);
        if let Some(g) = report.gesture {
            report.event = self.dashboard.handle_gesture(g, now_ms, &mut self.fb);
        }
        if let Some(DashboardEvent::BrightnessChanged(v)) = report.event {
            self.power.set_user_brightness(v);
        }

        // 3. + 4.
        self.dashboard.run_timers(now_ms, &mut self.fb);
        self.dashboard.animate(now_ms, &mut self.fb);

        // 5.
        if self.fb.is_dirty() {
            report.refresh = self.fb.refresh(&self.dashboard, &mut self.panel);
        }

        // 6.
        report.slept = self.power.tick(now_ms, &mut self.panel);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BacklightConfig, SCREEN_SIZE};
    use crate::mock::{MockBusError, MockDelay, MockPanel, MockPwm, MockTouch, PanelCmd};
    use crate::tiles;
    use embedded_graphics::{prelude::Point, primitives::Rectangle};

    type TestApp<'fb> = App<'fb, MockPanel, MockTouch, MockPwm, MockDelay>;

    fn app<'fb>(fb: &'fb mut [u16], touch: MockTouch, power: bool) -> TestApp<'fb> {
        let cfg = Config::default()
            .with_backlight(BacklightConfig::default().with_power_management(power));
        App::new(
            cfg,
            MockPanel::new(),
            fb,
            TouchSource::new(touch),
            MockPwm::new(),
            MockDelay::new(),
            0,
        )
        .unwrap()
    }

    fn screen() -> Vec<u16> {
        vec![0u16; SCREEN_WIDTH as usize * SCREEN_HEIGHT as usize]
    }

    // Steps from `from` to `to` (inclusive) every 5 ms.
    fn run(app: &mut TestApp<'_>, from: u64, to: u64) -> Vec<StepReport> {
        (from..=to).step_by(5).map(|t| app.step(t)).collect()
    }

    #[test]
    fn test_wrong_framebuffer_size() {
        let mut small = vec![0u16; 10];
        let err = App::new(
            Config::default(),
            MockPanel::new(),
            &mut small,
            TouchSource::new(MockTouch::new()),
            MockPwm::new(),
            MockDelay::new(),
            0,
        )
        .err();
        assert!(matches!(err, Some(AppError::FrameBuffer(_))));
    }

    #[test]
    fn test_first_step_flushes_full_screen() {
        let mut fb = screen();
        let mut app = app(&mut fb, MockTouch::new(), true);
        let r = app.step(0);

        assert_eq!(r.refresh.flushed, 1);
        let (area, bytes) = app.panel().flushes[0];
        assert_eq!(area, Rectangle::new(Point::zero(), SCREEN_SIZE));
        assert_eq!(bytes, 240 * 280 * 2);
    }

    #[test]
    fn test_tap_on_heart_rate_opens_detail() {
        let mut fb = screen();
        let mut touch = MockTouch::new();
        touch.press(50, 30);
        let mut app = app(&mut fb, touch, true);

        let reports = run(&mut app, 0, 40);
        assert!(reports.iter().any(|r| r.gesture == Some(Gesture::Tap(Point::new(50, 30)))));
        assert_eq!(app.dashboard().active_tile(), tiles::RIGHT);

        run(&mut app, 45, 400);
        assert!(!app.dashboard().is_animating());
    }

    #[test]
    fn test_clock_redraw_flushes_only_bands() {
        let mut fb = screen();
        let mut app = app(&mut fb, MockTouch::new(), true);
        app.step(0);
        let r = app.step(50);

        assert!(r.refresh.flushed >= 1);
        for (area, _) in &app.panel().flushes[1..] {
            assert!(area.size.height < SCREEN_HEIGHT as u32);
        }
    }

    #[test]
    fn test_sleeps_after_inactivity_and_wakes_on_touch() {
        let mut fb = screen();
        let mut app = app(&mut fb, MockTouch::new(), true);

        assert!(!app.step(10_000).slept);
        assert!(app.step(10_005).slept);
        assert!(!app.power().is_display_on());
        assert_eq!(&app.panel().cmds[..], &[PanelCmd::DisplayOff, PanelCmd::SleepIn]);

        // touch arrives through the controller on the next poll
        let mut touch = MockTouch::new();
        touch.press(120, 140);
        app.touch = TouchSource::new(touch);
        let r = app.step(20_000);

        assert!(r.touch.pressed);
        let s = app.power().state();
        assert!(s.is_display_on);
        assert_eq!(s.display_wake_ms, 20_000);
        assert_eq!(s.current_brightness, 255);
    }

    #[test]
    fn test_touch_after_failed_init_still_wakes() {
        let mut fb = screen();
        // init failed and the bus stays down for a while, then a press
        // arrives on the poll at 20 000 ms
        let mut touch = MockTouch::new();
        touch.fail().fail().idle(3998).press(120, 140);
        let cfg = Config::default()
            .with_backlight(BacklightConfig::default().with_power_management(true));
        let mut app = App::new(
            cfg,
            MockPanel::new(),
            &mut fb,
            TouchSource::from_init(touch, Err(MockBusError)),
            MockPwm::new(),
            MockDelay::new(),
            0,
        )
        .unwrap();

        let reports = run(&mut app, 0, 20_000);
        assert!(reports[10_005 / 5].slept);
        let last = reports.last().unwrap();
        assert!(last.touch.pressed);
        assert!(app.power().is_display_on());
        assert_eq!(app.power().state().display_wake_ms, 20_000);
    }

    #[test]
    fn test_power_management_off_keeps_display_on() {
        let mut fb = screen();
        let mut touch = MockTouch::new();
        touch.press(1, 1);
        let mut app = app(&mut fb, touch, false);

        app.step(0);
        assert_eq!(app.power().state().last_activity_ms, 0);
        assert!(!app.step(60_000).slept);
        assert!(app.power().is_display_on());
    }

    #[test]
    fn test_slider_sets_backlight() {
        let mut fb = screen();
        let mut touch = MockTouch::new();
        // swipe down to the settings tile
        touch.press(120, 40).press(122, 90).press(124, 150);
        let mut app = app(&mut fb, touch, true);
        run(&mut app, 0, 60);
        assert_eq!(app.dashboard().active_tile(), tiles::TOP);
        run(&mut app, 65, 500);

        let mut touch = MockTouch::new();
        touch.press(30, 140);
        app.touch = TouchSource::new(touch);
        let r = app.step(505);

        assert_eq!(r.event, Some(DashboardEvent::BrightnessChanged(10)));
        assert_eq!(app.power().target_brightness(), 10);
        assert_eq!(app.power().current_brightness(), 10);
    }

    #[test]
    fn test_failed_flush_is_retried_next_step() {
        let mut fb = screen();
        let mut app = app(&mut fb, MockTouch::new(), true);
        app.panel_mut().fail_flush = true;

        let r = app.step(0);
        assert_eq!(r.refresh.failed, 1);
        assert!(app.framebuffer().is_dirty());

        app.panel_mut().fail_flush = false;
        let r = app.step(5);
        assert_eq!(r.refresh.flushed, 1);
        assert_eq!(app.panel().flushes[0].0, Rectangle::new(Point::zero(), SCREEN_SIZE));
    }
}
