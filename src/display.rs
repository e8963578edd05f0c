//! Display setup and initialization module.
//
// - `setup_display` brings up SPI2 with DMA and initializes the ST7789.
// - `TimerDelay` is a SYSTIMER-backed `DelayNs` used for panel init and the
//   backlight fades.

use core::convert::Infallible;

use embedded_hal::{delay::DelayNs, spi::ErrorType};
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::{
    dma::{DmaBufError, DmaRxBuf, DmaTxBuf},
    dma_buffers,
    gpio::Output,
    spi::{
        master::{Config, ConfigError, Spi, SpiDmaBus},
        Mode,
    },
    time::Rate,
    timer::systimer::{SystemTimer, Unit},
    Blocking,
};
use log::info;

use crate::config::DMA_CHUNK;
use crate::panel::{PanelError, St7789};
use crate::wiring::DisplayPins;

// SYSTIMER busy-wait; accurate to a tick (16 MHz)
#[derive(Copy, Clone, Default)]
pub struct TimerDelay;

impl DelayNs for TimerDelay {
    fn delay_ns(&mut self, ns: u32) {
        let ticks = (ns as u64 * SystemTimer::ticks_per_second()).div_ceil(1_000_000_000);
        let start = SystemTimer::unit_value(Unit::Unit0);
        while SystemTimer::unit_value(Unit::Unit0).wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}

/// Milliseconds since boot.
pub fn now_ms() -> u64 {
    let t = SystemTimer::unit_value(Unit::Unit0);
    t.saturating_mul(1000) / SystemTimer::ticks_per_second()
}

pub type SpiDev<'a> = ExclusiveDevice<SpiDmaBus<'a, Blocking>, Output<'a>, NoDelay>;

pub type DisplayType<'a> = St7789<SpiDev<'a>, Output<'a>, Output<'a>>;

#[derive(Debug)]
pub enum DisplayError {
    Spi(ConfigError),
    Dma(DmaBufError),
    Panel(PanelError<<SpiDev<'static> as ErrorType>::Error, Infallible>),
}

impl From<ConfigError> for DisplayError {
    fn from(e: ConfigError) -> Self {
        DisplayError::Spi(e)
    }
}

impl From<DmaBufError> for DisplayError {
    fn from(e: DmaBufError) -> Self {
        DisplayError::Dma(e)
    }
}

/// SPI2 @ 40 MHz, mode 0, DMA on channel 0, then panel init.
///
/// `chunk_size` bounds one DMA transfer and must not exceed the TX buffer.
pub fn setup_display(
    display_pins: DisplayPins<'static>,
    chunk_size: usize,
    delay: &mut impl DelayNs,
) -> Result<DisplayType<'static>, DisplayError> {
    let DisplayPins {
        spi2,
        dma_ch0,
        sck,
        mosi,
        cs,
        dc,
        rst,
    } = display_pins;

    let spi = Spi::new(
        spi2,
        Config::default()
            .with_frequency(Rate::from_mhz(40))
            .with_mode(Mode::_0),
    )?
    .with_sck(sck)
    .with_mosi(mosi)
    .with_dma(dma_ch0);

    let (rx_buf, rx_desc, tx_buf, tx_desc) = dma_buffers!(4096, DMA_CHUNK);
    let rx = DmaRxBuf::new(rx_desc, rx_buf)?;
    let tx = DmaTxBuf::new(tx_desc, tx_buf)?;
    let spi_bus: SpiDmaBus<'static, Blocking> = spi.with_buffers(rx, tx);

    // CS is a plain GPIO, it cannot fail
    let spi_dev = match ExclusiveDevice::new(spi_bus, cs, NoDelay) {
        Ok(dev) => dev,
        Err(never) => match never {},
    };

    let panel = St7789::new(spi_dev, dc, Some(rst), delay, chunk_size.min(DMA_CHUNK))
        .map_err(DisplayError::Panel)?;
    info!("st7789 ready, chunk {} bytes", chunk_size.min(DMA_CHUNK));
    Ok(panel)
}
