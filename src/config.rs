//! Firmware configuration.
//!
//! Compile-time defaults live in the constants below; Cargo features pick the
//! board-dependent ones. [`Config`] groups them per controller so tests and
//! alternative boards can override single values with the `with_*` builders.

use embedded_graphics::prelude::{Point, Size};

use crate::backlight::Polarity;

// Panel geometry, (0,0) is top-left corner
pub const SCREEN_WIDTH: u16 = 240;
pub const SCREEN_HEIGHT: u16 = 280;
pub const SCREEN_SIZE: Size = Size::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);

// ST7789 240x280 glass sits 20 rows into the 240x320 controller RAM
pub const PANEL_X_OFFSET: u16 = 0;
pub const PANEL_Y_OFFSET: u16 = 20;

// 32736 = 32 * 1023, largest single SPI DMA transfer on the ESP32-S3
pub const DMA_CHUNK: usize = 32 * 1023;

// Backlight
pub const MAX_BRIGHTNESS: u8 = 255;
pub const MIN_USER_BRIGHTNESS: u8 = 10;
pub const FADE_STEP: u8 = 10;
pub const FADE_INTERVAL_MS: u32 = 5;
pub const WAKE_SETTLE_MS: u32 = 10;
pub const INACTIVITY_TIMEOUT_MS: u64 = 10_000;

cfg_if::cfg_if! {
    if #[cfg(feature = "backlight-active-low")] {
        pub const BACKLIGHT_POLARITY: Polarity = Polarity::ActiveLow;
    } else {
        pub const BACKLIGHT_POLARITY: Polarity = Polarity::ActiveHigh;
    }
}

// Analog clock face, in center-tile coordinates
pub const CLOCK_CENTER: Point = Point::new(120, 140);
pub const CLOCK_RADIUS: i32 = 100;
// Clock starts at 10:10:00
pub const CLOCK_EPOCH_SECS: u32 = 10 * 3600 + 10 * 60;

// Timers
pub const CLOCK_PERIOD_MS: u32 = 50;
pub const FLIGHT_PERIOD_MS: u32 = 5000;
pub const SLIDE_DURATION_MS: u32 = 300;

// Touch gestures
pub const TAP_SLOP_PX: i32 = 10;
pub const SWIPE_MIN_PX: i32 = 40;
pub const RELEASE_DEBOUNCE_MS: u64 = 30;

// Main loop idle between polls
pub const LOOP_DELAY_MS: u32 = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    pub chunk_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { chunk_size: DMA_CHUNK }
    }
}

impl TransportConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BacklightConfig {
    /// Run the inactivity policy and wake on touch.
    pub power_management: bool,
    pub polarity: Polarity,
    pub initial_brightness: u8,
    pub fade_step: u8,
    pub fade_interval_ms: u32,
    pub wake_settle_ms: u32,
    pub inactivity_timeout_ms: u64,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            power_management: cfg!(feature = "backlight"),
            polarity: BACKLIGHT_POLARITY,
            initial_brightness: MAX_BRIGHTNESS,
            fade_step: FADE_STEP,
            fade_interval_ms: FADE_INTERVAL_MS,
            wake_settle_ms: WAKE_SETTLE_MS,
            inactivity_timeout_ms: INACTIVITY_TIMEOUT_MS,
        }
    }
}

impl BacklightConfig {
    pub fn with_power_management(mut self, enabled: bool) -> Self {
        self.power_management = enabled;
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_initial_brightness(mut self, level: u8) -> Self {
        self.initial_brightness = level;
        self
    }

    pub fn with_fade(mut self, step: u8, interval_ms: u32) -> Self {
        // zero step would never reach the end value
        self.fade_step = step.max(1);
        self.fade_interval_ms = interval_ms;
        self
    }

    pub fn with_inactivity_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.inactivity_timeout_ms = timeout_ms;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    pub center: Point,
    pub radius: i32,
    pub epoch_secs: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            center: CLOCK_CENTER,
            radius: CLOCK_RADIUS,
            epoch_secs: CLOCK_EPOCH_SECS,
        }
    }
}

impl ClockConfig {
    pub fn with_epoch(mut self, hours: u32, minutes: u32, seconds: u32) -> Self {
        self.epoch_secs = hours * 3600 + minutes * 60 + seconds;
        self
    }
}

/// What the tile above the dashboard shows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TopTile {
    Settings,
    FlightBoard,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DashboardConfig {
    pub top_tile: TopTile,
    pub clock_period_ms: u32,
    pub flight_period_ms: u32,
    pub slide_duration_ms: u32,
    pub rng_seed: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_tile: if cfg!(feature = "flight-board") {
                TopTile::FlightBoard
            } else {
                TopTile::Settings
            },
            clock_period_ms: CLOCK_PERIOD_MS,
            flight_period_ms: FLIGHT_PERIOD_MS,
            slide_duration_ms: SLIDE_DURATION_MS,
            rng_seed: 0x2545_F491,
        }
    }
}

impl DashboardConfig {
    pub fn with_top_tile(mut self, top_tile: TopTile) -> Self {
        self.top_tile = top_tile;
        self
    }

    pub fn with_slide_duration_ms(mut self, duration_ms: u32) -> Self {
        self.slide_duration_ms = duration_ms;
        self
    }

    pub fn with_rng_seed(mut self, seed: u32) -> Self {
        self.rng_seed = seed;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InputConfig {
    pub tap_slop_px: i32,
    pub swipe_min_px: i32,
    pub release_debounce_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            tap_slop_px: TAP_SLOP_PX,
            swipe_min_px: SWIPE_MIN_PX,
            release_debounce_ms: RELEASE_DEBOUNCE_MS,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub transport: TransportConfig,
    pub backlight: BacklightConfig,
    pub clock: ClockConfig,
    pub dashboard: DashboardConfig,
    pub input: InputConfig,
}

impl Config {
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_backlight(mut self, backlight: BacklightConfig) -> Self {
        self.backlight = backlight;
        self
    }

    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dashboard(mut self, dashboard: DashboardConfig) -> Self {
        self.dashboard = dashboard;
        self
    }

    pub fn with_input(mut self, input: InputConfig) -> Self {
        self.input = input;
        self
    }
}
