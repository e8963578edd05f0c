#![cfg_attr(not(test), no_std)]

pub mod app;
pub mod backlight;
pub mod clock;
pub mod config;
pub mod cst816s;
pub mod dashboard;
pub mod flight;
pub mod framebuffer;
pub mod input;
pub mod metrics;
pub mod panel;
pub mod power;
pub mod scheduler;
pub mod tiles;
pub mod touch;
pub mod transport;
pub mod ui;

#[cfg(feature = "esp32s3")]
pub mod display;
#[cfg(feature = "esp32s3")]
pub mod wiring;

#[cfg(test)]
mod mock;
