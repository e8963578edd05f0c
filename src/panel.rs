// Minimal ST7789 panel driver (4-wire SPI, D/C pin).
// Works with esp-hal (no_std) and any embedded-hal 1.0 SpiDevice.
//
// Wiring on the 1.69" 240x280 board:
//   CS   = GPIO5
//   SCK  = GPIO6
//   MOSI = GPIO7
//   DC   = GPIO4
//   RST  = GPIO8
//
// Protocol:
//   D/C low  -> one opcode byte
//   D/C high -> N parameter / pixel bytes
//   Pixels go out as RAMWR (0x2C) followed by big-endian RGB565, streamed in
//   chunks no larger than one DMA transfer.
// Geometry: 240 x 280 visible, placed 20 rows into the 240 x 320 controller RAM.

use core::fmt;

use embedded_graphics::{prelude::*, primitives::Rectangle};
use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};
use log::debug;

use crate::config::{PANEL_X_OFFSET, PANEL_Y_OFFSET, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::framebuffer::FlushSink;
use crate::transport::{write_chunked, SpiLink, TransportError};

const SWRESET: u8 = 0x01;
const SLPIN: u8 = 0x10;
const SLPOUT: u8 = 0x11;
const NORON: u8 = 0x13;
const INVON: u8 = 0x21;
const DISPOFF: u8 = 0x28;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;

/// Panel sleep and display-enable opcodes, as used by the power controller.
pub trait PanelPower {
    type Error: fmt::Debug;

    fn sleep_out(&mut self) -> Result<(), Self::Error>;
    fn display_on(&mut self) -> Result<(), Self::Error>;
    fn display_off(&mut self) -> Result<(), Self::Error>;
    fn sleep_in(&mut self) -> Result<(), Self::Error>;
}

// Error type that wraps SPI and GPIO errors.
#[derive(Debug, PartialEq, Eq)]
pub enum PanelError<SpiE, GpioE> {
    Spi(SpiE),
    Gpio(GpioE),
    /// Pixel stream broke off part way through a flush.
    Link(TransportError<SpiE>),
    OutOfBounds,
}

impl<SpiE: fmt::Debug, GpioE: fmt::Debug> fmt::Display for PanelError<SpiE, GpioE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::Spi(e) => write!(f, "spi error: {:?}", e),
            PanelError::Gpio(e) => write!(f, "gpio error: {:?}", e),
            PanelError::Link(e) => write!(f, "{}", e),
            PanelError::OutOfBounds => f.write_str("window outside panel"),
        }
    }
}

/// ST7789 on a shared-nothing SPI device. CS is handled by the `SpiDevice`.
pub struct St7789<SPI, DC, RST> {
    spi: SPI,
    dc: DC,
    rst: Option<RST>,
    w: u16,
    h: u16,
    x_off: u16,
    y_off: u16,
    chunk_size: usize,
}

impl<SPI, DC, RST> St7789<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
{
    /// Create + init the panel. Call once at startup.
    ///
    /// * `spi` - an SPI device with CS control (e.g., `embedded_hal_bus::spi::ExclusiveDevice`)
    /// * `dc` - data/command select
    /// * `rst` - optional reset pin
    /// * `chunk_size` - largest single pixel transfer the link accepts
    pub fn new(
        spi: SPI,
        dc: DC,
        rst: Option<RST>,
        delay: &mut impl DelayNs,
        chunk_size: usize,
    ) -> Result<Self, PanelError<SPI::Error, DC::Error>> {
        let mut this = Self {
            spi,
            dc,
            rst,
            w: SCREEN_WIDTH,
            h: SCREEN_HEIGHT,
            x_off: PANEL_X_OFFSET,
            y_off: PANEL_Y_OFFSET,
            chunk_size,
        };

        // Hard reset sequence
        if let Some(r) = this.rst.as_mut() {
            r.set_high().map_err(PanelError::Gpio)?;
            delay.delay_ms(2);
            r.set_low().map_err(PanelError::Gpio)?;
            delay.delay_ms(10);
            r.set_high().map_err(PanelError::Gpio)?;
            delay.delay_ms(120);
        }

        this.cmd(SWRESET, &[])?;
        delay.delay_ms(150);

        this.cmd(SLPOUT, &[])?;
        delay.delay_ms(120);

        // 16bpp, RGB order, no rotation
        this.cmd(COLMOD, &[0x55])?;
        this.cmd(MADCTL, &[0x00])?;
        // IPS glass needs inversion for true colors
        this.cmd(INVON, &[])?;
        this.cmd(NORON, &[])?;

        let (w, h) = (this.w, this.h);
        this.set_window_raw(0, 0, w - 1, h - 1)?;

        this.cmd(DISPON, &[])?;
        delay.delay_ms(20);

        debug!("st7789 ready {}x{}", w, h);
        Ok(this)
    }

    // Window set, applies panel offsets.
    fn set_window_raw(
        &mut self,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), PanelError<SPI::Error, DC::Error>> {
        if x0 > x1 || y0 > y1 || x1 >= self.w || y1 >= self.h {
            return Err(PanelError::OutOfBounds);
        }

        let x0p = x0 + self.x_off;
        let x1p = x1 + self.x_off;
        let y0p = y0 + self.y_off;
        let y1p = y1 + self.y_off;

        let ca = [(x0p >> 8) as u8, (x0p & 0xFF) as u8, (x1p >> 8) as u8, (x1p & 0xFF) as u8];
        let ra = [(y0p >> 8) as u8, (y0p & 0xFF) as u8, (y1p >> 8) as u8, (y1p & 0xFF) as u8];

        self.cmd(CASET, &ca)?;
        self.cmd(RASET, &ra)?;
        Ok(())
    }

    /// Push one window of big-endian RGB565 pixels.
    pub fn write_area(
        &mut self,
        area: &Rectangle,
        pixels: &[u8],
    ) -> Result<(), PanelError<SPI::Error, DC::Error>> {
        let Some(br) = area.bottom_right() else {
            return Ok(());
        };
        if area.top_left.x < 0 || area.top_left.y < 0 || br.x < 0 || br.y < 0 {
            return Err(PanelError::OutOfBounds);
        }
        let expected = (area.size.width as usize) * (area.size.height as usize) * 2;
        if pixels.len() != expected {
            return Err(PanelError::OutOfBounds);
        }

        self.set_window_raw(
            area.top_left.x as u16,
            area.top_left.y as u16,
            br.x as u16,
            br.y as u16,
        )?;

        // RAMWR, then D/C stays high for every chunk of the stream
        self.cmd(RAMWR, &[])?;
        self.dc.set_high().map_err(PanelError::Gpio)?;
        write_chunked(&mut SpiLink(&mut self.spi), pixels, self.chunk_size)
            .map_err(PanelError::Link)?;
        Ok(())
    }

    // ---- Low-level helpers ----

    fn cmd(&mut self, op: u8, data: &[u8]) -> Result<(), PanelError<SPI::Error, DC::Error>> {
        self.dc.set_low().map_err(PanelError::Gpio)?;
        self.spi.write(&[op]).map_err(PanelError::Spi)?;
        if !data.is_empty() {
            self.dc.set_high().map_err(PanelError::Gpio)?;
            self.spi.write(data).map_err(PanelError::Spi)?;
        }
        Ok(())
    }

    pub fn release(self) -> (SPI, DC, Option<RST>) {
        (self.spi, self.dc, self.rst)
    }
}

impl<SPI, DC, RST> PanelPower for St7789<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
{
    type Error = PanelError<SPI::Error, DC::Error>;

    fn sleep_out(&mut self) -> Result<(), Self::Error> {
        self.cmd(SLPOUT, &[])
    }

    fn display_on(&mut self) -> Result<(), Self::Error> {
        self.cmd(DISPON, &[])
    }

    fn display_off(&mut self) -> Result<(), Self::Error> {
        self.cmd(DISPOFF, &[])
    }

    fn sleep_in(&mut self) -> Result<(), Self::Error> {
        self.cmd(SLPIN, &[])
    }
}

impl<SPI, DC, RST> FlushSink for St7789<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin<Error = DC::Error>,
{
    type Error = PanelError<SPI::Error, DC::Error>;

    fn flush(&mut self, area: Rectangle, pixels: &[u8]) -> Result<(), Self::Error> {
        self.write_area(&area, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDelay, MockPin, MockSpi, SpiOp};

    fn panel(chunk: usize) -> St7789<MockSpi, MockPin, MockPin> {
        let mut delay = MockDelay::new();
        let dc = MockPin::new();
        let spi = MockSpi::with_dc(&dc);
        let mut panel = St7789::new(spi, dc, None, &mut delay, chunk).unwrap();
        panel.spi.ops.clear();
        panel
    }

    #[test]
    fn test_init_wakes_and_enables_panel() {
        let mut delay = MockDelay::new();
        let dc = MockPin::new();
        let spi = MockSpi::with_dc(&dc);
        let panel = St7789::new(spi, dc, Some(MockPin::new()), &mut delay, 64).unwrap();
        let cmds = panel.spi.commands();
        assert_eq!(cmds.first(), Some(&SWRESET));
        assert!(cmds.contains(&SLPOUT));
        assert_eq!(cmds.last(), Some(&DISPON));
        assert!(delay.total_ms() >= 270);
    }

    #[test]
    fn test_window_applies_row_offset() {
        let mut p = panel(64);
        let area = Rectangle::new(Point::new(0, 10), Size::new(240, 2));
        p.write_area(&area, &[0u8; 240 * 2 * 2]).unwrap();

        let ops = &p.spi.ops;
        // CASET 0..239
        assert_eq!(ops[0], SpiOp::Cmd(CASET));
        assert_eq!(ops[1], SpiOp::Data(vec![0, 0, 0, 239]));
        // RASET 30..31
        assert_eq!(ops[2], SpiOp::Cmd(RASET));
        assert_eq!(ops[3], SpiOp::Data(vec![0, 30, 0, 31]));
        assert_eq!(ops[4], SpiOp::Cmd(RAMWR));
    }

    #[test]
    fn test_pixels_stream_in_bounded_chunks() {
        let mut p = panel(300);
        let area = Rectangle::new(Point::new(0, 0), Size::new(240, 2));
        let pixels = [0x5Au8; 240 * 2 * 2];
        p.write_area(&area, &pixels).unwrap();

        let sizes: Vec<usize> = p.spi.ops[5..]
            .iter()
            .map(|op| match op {
                SpiOp::Data(d) => d.len(),
                SpiOp::Cmd(c) => panic!("unexpected command {c:#x} inside pixel stream"),
            })
            .collect();
        assert_eq!(sizes, vec![300, 300, 300, 60]);
        // chip select stays asserted for the whole stream
        assert_eq!(p.spi.transactions.last(), Some(&4));
    }

    #[test]
    fn test_mid_stream_failure_surfaces_link_error() {
        let mut p = panel(300);
        // window (4 writes) + RAMWR (1) + 2 good chunks, then fail
        p.spi.fail_after = Some(7);
        let area = Rectangle::new(Point::new(0, 0), Size::new(240, 2));
        let err = p.write_area(&area, &[0u8; 960]).unwrap_err();
        // the whole stream is one burst
        assert!(matches!(err, PanelError::Link(TransportError::Link { offset: 0, .. })));
    }

    #[test]
    fn test_rejects_wrong_pixel_count() {
        let mut p = panel(64);
        let area = Rectangle::new(Point::new(0, 0), Size::new(4, 4));
        assert_eq!(p.write_area(&area, &[0u8; 10]), Err(PanelError::OutOfBounds));
    }

    #[test]
    fn test_power_opcodes() {
        let mut p = panel(64);
        p.display_off().unwrap();
        p.sleep_in().unwrap();
        p.sleep_out().unwrap();
        p.display_on().unwrap();
        assert_eq!(p.spi.commands(), vec![DISPOFF, SLPIN, SLPOUT, DISPON]);
    }
}
