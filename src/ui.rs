//! Tile rendering.
//!
//! This module provides:
//! - The layout constants shared by drawing and hit testing (widget areas,
//!   the brightness slider)
//! - One drawing function per tile kind, all in tile-local coordinates
//!   (0,0 is the tile's top-left corner)
//!
//! Drawing errors are ignored; the framebuffer target cannot fail.

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::Rgb565,
    prelude::{Point, Primitive, RgbColor, Size},
    primitives::{Circle, PrimitiveStyle, Rectangle, RoundedRectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
    draw_target::DrawTarget,
    Drawable,
};

use crate::clock::AnalogClock;
use crate::config::{MAX_BRIGHTNESS, MIN_USER_BRIGHTNESS, SCREEN_SIZE, SCREEN_WIDTH};
use crate::flight::{FlightRecord, FLIGHTS};
use crate::metrics::SimulatedMetrics;
use crate::tiles::TileKind;

pub const CENTER_X: i32 = SCREEN_WIDTH as i32 / 2;

// Dashboard widgets, also the tap targets
pub const HR_AREA: Rectangle = Rectangle::new(Point::new(10, 10), Size::new(80, 40));
pub const BATTERY_AREA: Rectangle = Rectangle::new(Point::new(150, 10), Size::new(80, 40));
pub const STEPS_AREA: Rectangle = Rectangle::new(Point::new(70, 230), Size::new(100, 40));

// Brightness slider, 180 px wide and centered on the settings tile
pub const SLIDER_TRACK: Rectangle = Rectangle::new(Point::new(30, 135), Size::new(180, 10));
const KNOB_DIAMETER: u32 = 20;
// Touch area around the track, generous for a finger
pub const SLIDER_HIT: Rectangle = Rectangle::new(Point::new(20, 115), Size::new(200, 50));
// Track, knob and value text
pub const SLIDER_DIRTY: Rectangle = Rectangle::new(Point::new(10, 120), Size::new(220, 60));

// Rotating flight fields on the departure board
pub const FLIGHT_FIELDS: Rectangle = Rectangle::new(Point::new(0, 70), Size::new(240, 150));

const BG_DARK: Rgb565 = Rgb565::new(4, 8, 4); // 0x202020
const TEXT_DIM: Rgb565 = Rgb565::new(21, 42, 21); // 0xAAAAAA
const SLIDER_BLUE: Rgb565 = Rgb565::new(4, 37, 30); // 0x2196F3
const GREEN_MAIN: Rgb565 = Rgb565::new(9, 43, 10); // 0x4CAF50
const ORANGE_MAIN: Rgb565 = Rgb565::new(31, 38, 0); // 0xFF9800
const PURPLE_MAIN: Rgb565 = Rgb565::new(19, 9, 22); // 0x9C27B0

const STEPS_TEXT: &str = "Steps Details\n\n- Today: 12345\n- Goal: 10000";
const BATTERY_TEXT: &str = "Battery Status\n\n- Level: 85%\n- Charging: No";
const HEART_TEXT: &str = "Heart Rate\n\n- Avg: 72 bpm\n- Max: 120 bpm";

/// Slider value under x, clamped to the track.
pub fn slider_value_at(x: i32) -> u8 {
    let x0 = SLIDER_TRACK.top_left.x;
    let w = SLIDER_TRACK.size.width as i32 - 1;
    let span = (MAX_BRIGHTNESS - MIN_USER_BRIGHTNESS) as i32;
    let dx = (x - x0).clamp(0, w);
    (MIN_USER_BRIGHTNESS as i32 + (dx * span + w / 2) / w) as u8
}

fn slider_x_of(value: u8) -> i32 {
    let w = SLIDER_TRACK.size.width as i32 - 1;
    let span = (MAX_BRIGHTNESS - MIN_USER_BRIGHTNESS) as i32;
    let v = value.max(MIN_USER_BRIGHTNESS) as i32 - MIN_USER_BRIGHTNESS as i32;
    SLIDER_TRACK.top_left.x + v * w / span
}

fn centered<'a>(text: &'a str, at: Point, style: MonoTextStyle<'a, Rgb565>) -> Text<'a, MonoTextStyle<'a, Rgb565>> {
    let ts = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(text, at, style, ts)
}

// Only the tile's own area; neighbours share the target while sliding.
fn fill<D: DrawTarget<Color = Rgb565>>(target: &mut D, color: Rgb565) {
    target
        .fill_solid(&Rectangle::new(Point::zero(), SCREEN_SIZE), color)
        .ok();
}

/// Center tile: clock face, hands and the three metric widgets.
pub fn draw_dashboard<D>(target: &mut D, clock: &AnalogClock, metrics: &SimulatedMetrics)
where
    D: DrawTarget<Color = Rgb565>,
{
    fill(target, Rgb565::BLACK);
    clock.draw(target).ok();

    let style = MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE);
    let hr = metrics.heart_rate_label();
    let bat = metrics.battery_label();
    let steps = metrics.steps_label();

    centered(&hr, HR_AREA.center(), MonoTextStyle::new(&FONT_10X20, Rgb565::RED))
        .draw(target)
        .ok();
    centered(&bat, BATTERY_AREA.center(), MonoTextStyle::new(&FONT_10X20, Rgb565::GREEN))
        .draw(target)
        .ok();
    centered(&steps, STEPS_AREA.center(), style).draw(target).ok();
}

/// Top tile, settings variant: the backlight slider.
pub fn draw_settings<D>(target: &mut D, brightness: u8)
where
    D: DrawTarget<Color = Rgb565>,
{
    fill(target, BG_DARK);

    centered("Settings", Point::new(CENTER_X, 30), MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE))
        .draw(target)
        .ok();
    centered(
        "Backlight Brightness",
        Point::new(CENTER_X, SLIDER_TRACK.top_left.y - 15),
        MonoTextStyle::new(&FONT_6X10, TEXT_DIM),
    )
    .draw(target)
    .ok();

    // track, filled part, knob
    let radius = Size::new(5, 5);
    RoundedRectangle::with_equal_corners(SLIDER_TRACK, radius)
        .into_styled(PrimitiveStyle::with_fill(Rgb565::new(10, 20, 10)))
        .draw(target)
        .ok();
    let knob_x = slider_x_of(brightness);
    let filled = Rectangle::with_corners(
        SLIDER_TRACK.top_left,
        Point::new(knob_x, SLIDER_TRACK.top_left.y + SLIDER_TRACK.size.height as i32 - 1),
    );
    RoundedRectangle::with_equal_corners(filled, radius)
        .into_styled(PrimitiveStyle::with_fill(SLIDER_BLUE))
        .draw(target)
        .ok();
    Circle::with_center(Point::new(knob_x, SLIDER_TRACK.center().y), KNOB_DIAMETER)
        .into_styled(PrimitiveStyle::with_fill(Rgb565::WHITE))
        .draw(target)
        .ok();

    let mut value: heapless::String<8> = heapless::String::new();
    let _ = core::fmt::write(&mut value, format_args!("{}", brightness));
    centered(&value, Point::new(CENTER_X, 165), MonoTextStyle::new(&FONT_10X20, TEXT_DIM))
        .draw(target)
        .ok();
}

/// Top tile, departure board variant.
pub fn draw_flight_board<D>(target: &mut D, index: usize, rec: &FlightRecord)
where
    D: DrawTarget<Color = Rgb565>,
{
    fill(target, Rgb565::BLACK);

    centered("DEPARTURES", Point::new(CENTER_X, 30), MonoTextStyle::new(&FONT_10X20, Rgb565::YELLOW))
        .draw(target)
        .ok();

    let big = MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE);
    centered(rec.time, Point::new(CENTER_X, 95), big).draw(target).ok();
    centered(rec.destination, Point::new(CENTER_X, 135), big).draw(target).ok();
    centered(rec.status.as_str(), Point::new(CENTER_X, 175), MonoTextStyle::new(&FONT_10X20, rec.status.color()))
        .draw(target)
        .ok();

    let mut pos: heapless::String<8> = heapless::String::new();
    let _ = core::fmt::write(&mut pos, format_args!("{}/{}", index + 1, FLIGHTS.len()));
    centered(&pos, Point::new(CENTER_X, 210), MonoTextStyle::new(&FONT_6X10, TEXT_DIM))
        .draw(target)
        .ok();
}

/// Bottom, left and right tiles: fixed text on a colored background.
pub fn draw_detail<D>(target: &mut D, kind: TileKind)
where
    D: DrawTarget<Color = Rgb565>,
{
    let (bg, text) = match kind {
        TileKind::StepsDetail => (GREEN_MAIN, STEPS_TEXT),
        TileKind::BatteryDetail => (ORANGE_MAIN, BATTERY_TEXT),
        TileKind::HeartRateDetail => (PURPLE_MAIN, HEART_TEXT),
        _ => return,
    };
    fill(target, bg);
    // four lines, first one a bit above the middle
    centered(text, Point::new(CENTER_X, 110), MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE))
        .draw(target)
        .ok();
}
