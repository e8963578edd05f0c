//! Tile Watch firmware
//! ========================================
//! source ~/export-esp.sh
//! cargo run --release --features esp32s3
//! ========================================
//!
//! Five-tile dashboard on a 240x280 ST7789 with CST816S touch. The screen
//! sleeps after 10 s without touches and wakes on the next one.

//% CHIPS: esp32s3
//% FEATURES: esp-hal/unstable

#![no_std]
#![no_main]

// Define the application description, which is placed in a special section of the binary.
// This is used by the bootloader to verify the application.
// The macro automatically fills in the fields.
esp_bootloader_esp_idf::esp_app_desc!();

// Core imports
use core::cell::RefCell;
use critical_section::Mutex;
use esp_backtrace as _;

// ESP-HAL imports
use esp_hal::{
    gpio::{DriveMode, Input},
    handler,
    i2c::master::{Config as I2cConfig, I2c},
    ledc::{
        channel::{self, ChannelIFace as _},
        timer::{self, TimerIFace as _},
        LSGlobalClkSource, Ledc, LowSpeed,
    },
    main, psram, ram,
    time::Rate,
    Config,
};

use embedded_hal::delay::DelayNs;
use log::info;

// Allocator for PSRAM
extern crate alloc;
use alloc::{boxed::Box, vec};

use tile_watch::{
    app::App,
    config::{Config as AppConfig, LOOP_DELAY_MS, SCREEN_HEIGHT, SCREEN_WIDTH},
    cst816s::Cst816s,
    display::{now_ms, setup_display, TimerDelay},
    input::IrqLatch,
    touch::TouchSource,
    wiring::{init_board_pins, BoardPins, TouchPins},
};

// Raised by the touch INT falling edge, consumed by the CST816S driver
static TOUCH_IRQ: IrqLatch = IrqLatch::new();
static TOUCH_INT: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

// Interrupt handler
#[handler]
#[ram]
fn handler() {
    let fired = critical_section::with(|cs| {
        let mut int = TOUCH_INT.borrow_ref_mut(cs);
        match int.as_mut() {
            Some(pin) if pin.is_interrupt_set() => {
                pin.clear_interrupt();
                true
            }
            _ => false,
        }
    });
    if fired {
        TOUCH_IRQ.set();
    }
}

#[main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();

    // Initialize peripherals
    let peripherals = esp_hal::init(Config::default());
    esp_alloc::psram_allocator!(&peripherals.PSRAM, psram);

    let (mut io, pins) = init_board_pins(peripherals);
    let BoardPins {
        display,
        backlight,
        touch,
    } = pins;

    let cfg = AppConfig::default();
    let mut delay = TimerDelay;

    // -------------------- Display --------------------
    let panel =
        setup_display(display, cfg.transport.chunk_size, &mut delay).expect("display init failed");

    // -------------------- Backlight (LEDC PWM) --------------------
    let mut ledc = Ledc::new(backlight.ledc);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

    let mut bl_timer = ledc.timer::<LowSpeed>(timer::Number::Timer0);
    bl_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty8Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_khz(24),
        })
        .expect("backlight timer");
    // the channel keeps a reference for its whole life
    let bl_timer: &'static timer::Timer<'static, LowSpeed> = Box::leak(Box::new(bl_timer));

    let mut bl = ledc.channel::<LowSpeed>(channel::Number::Channel0, backlight.pin);
    bl.configure(channel::config::Config {
        timer: bl_timer,
        duty_pct: 0,
        drive_mode: DriveMode::PushPull,
    })
    .expect("backlight channel");

    // -------------------- Touch --------------------
    let TouchPins {
        i2c0,
        sda,
        scl,
        rst,
        int,
    } = touch;
    critical_section::with(|cs| TOUCH_INT.borrow_ref_mut(cs).replace(int));
    io.set_interrupt_handler(handler);

    let i2c = I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(100)))
        .expect("touch i2c config")
        .with_sda(sda)
        .with_scl(scl);
    let mut ctl = Cst816s::new(i2c, rst, &TOUCH_IRQ);
    // a chip that missed its init is still polled every loop
    let init = ctl.begin(&mut delay);
    let touch = TouchSource::from_init(ctl, init);

    // -------------------- Framebuffer (PSRAM) --------------------
    let fb: &'static mut [u16] = Box::leak(
        vec![0u16; SCREEN_WIDTH as usize * SCREEN_HEIGHT as usize].into_boxed_slice(),
    );

    let mut app = App::new(cfg, panel, fb, touch, bl, TimerDelay, now_ms()).expect("app init failed");
    info!("tile watch running");

    // -------------------- Main loop --------------------
    loop {
        app.step(now_ms());
        delay.delay_ms(LOOP_DELAY_MS);
    }
}
