//! Minimal CST816S capacitive touch driver.
//! The controller sits on I2C at 0x15 and pulls its INT line low whenever it
//! has a new report (roughly every 10 ms while a finger is down). The ISR only
//! raises an [`IrqLatch`]; the main loop reads the report registers.

use core::fmt;

use embedded_hal::{delay::DelayNs, digital::OutputPin, i2c};
use embedded_graphics::prelude::Point;
use log::debug;

use crate::input::IrqLatch;
use crate::touch::TouchController;

pub const DEFAULT_I2C_ADDR: u8 = 0x15;

const REG_GESTURE_ID: u8 = 0x01; // gesture, fingers, XH, XL, YH, YL follow
const REG_CHIP_ID: u8 = 0xA7;
const REG_FW_VERSION: u8 = 0xA9;
const REG_DIS_AUTO_SLEEP: u8 = 0xFE;

// Controller-side gesture codes, byte 0 of the report
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HwGesture {
    None,
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
    SingleClick,
    DoubleClick,
    LongPress,
    Unknown(u8),
}

impl From<u8> for HwGesture {
    fn from(v: u8) -> Self {
        match v {
            0x00 => HwGesture::None,
            0x01 => HwGesture::SwipeUp,
            0x02 => HwGesture::SwipeDown,
            0x03 => HwGesture::SwipeLeft,
            0x04 => HwGesture::SwipeRight,
            0x05 => HwGesture::SingleClick,
            0x0B => HwGesture::DoubleClick,
            0x0C => HwGesture::LongPress,
            other => HwGesture::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchReport {
    pub gesture: HwGesture,
    pub fingers: u8,
    pub x: u16,
    pub y: u16,
}

impl TouchReport {
    // 12-bit coordinates, high nibble in the low bits of XH / YH
    fn parse(buf: &[u8; 6]) -> Self {
        Self {
            gesture: HwGesture::from(buf[0]),
            fingers: buf[1],
            x: (((buf[2] & 0x0F) as u16) << 8) | buf[3] as u16,
            y: (((buf[4] & 0x0F) as u16) << 8) | buf[5] as u16,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TouchError<BusE, PinE> {
    Bus(BusE),
    Pin(PinE),
}

impl<BusE: fmt::Debug, PinE: fmt::Debug> fmt::Display for TouchError<BusE, PinE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TouchError::Bus(e) => write!(f, "i2c error: {:?}", e),
            TouchError::Pin(e) => write!(f, "reset pin error: {:?}", e),
        }
    }
}

// CST816S driver
pub struct Cst816s<'l, I2C, RST> {
    i2c: I2C,
    rst: RST,
    address: u8,
    irq: &'l IrqLatch,
    last: Option<TouchReport>,
}

impl<'l, I2C, RST> Cst816s<'l, I2C, RST>
where
    I2C: i2c::I2c,
    RST: OutputPin,
{
    pub fn new(i2c: I2C, rst: RST, irq: &'l IrqLatch) -> Self {
        Self {
            i2c,
            rst,
            address: DEFAULT_I2C_ADDR,
            irq,
            last: None,
        }
    }

    /// Reset pulse, then keep the controller from dozing off between touches.
    pub fn begin(&mut self, delay: &mut impl DelayNs) -> Result<(), TouchError<I2C::Error, RST::Error>> {
        self.rst.set_high().map_err(TouchError::Pin)?;
        delay.delay_ms(50);
        self.rst.set_low().map_err(TouchError::Pin)?;
        delay.delay_ms(5);
        self.rst.set_high().map_err(TouchError::Pin)?;
        delay.delay_ms(50);

        let chip = self.read_reg(REG_CHIP_ID)?;
        let fw = self.read_reg(REG_FW_VERSION)?;
        debug!("cst816s chip {:#04x} fw {}", chip, fw);

        // without this the first touch after a few seconds is lost
        self.write_reg(REG_DIS_AUTO_SLEEP, 0x01)?;

        // drop anything latched during reset
        self.irq.take();
        Ok(())
    }

    /// Read the six report bytes.
    pub fn read_report(&mut self) -> Result<TouchReport, TouchError<I2C::Error, RST::Error>> {
        let mut buf = [0u8; 6];
        self.i2c
            .write_read(self.address, &[REG_GESTURE_ID], &mut buf)
            .map_err(TouchError::Bus)?;
        let report = TouchReport::parse(&buf);
        self.last = Some(report);
        Ok(report)
    }

    fn write_reg(&mut self, reg: u8, val: u8) -> Result<(), TouchError<I2C::Error, RST::Error>> {
        self.i2c
            .write(self.address, &[reg, val])
            .map_err(TouchError::Bus)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, TouchError<I2C::Error, RST::Error>> {
        let mut out = [0u8];
        self.i2c
            .write_read(self.address, &[reg], &mut out)
            .map_err(TouchError::Bus)?;
        Ok(out[0])
    }
}

impl<I2C, RST> TouchController for Cst816s<'_, I2C, RST>
where
    I2C: i2c::I2c,
    RST: OutputPin,
{
    type Error = TouchError<I2C::Error, RST::Error>;

    fn available(&mut self) -> Result<bool, Self::Error> {
        if !self.irq.take() {
            return Ok(false);
        }
        // lift-off also raises INT, with zero fingers
        Ok(self.read_report()?.fingers > 0)
    }

    fn last_point(&self) -> Point {
        self.last
            .map(|r| Point::new(r.x as i32, r.y as i32))
            .unwrap_or_default()
    }
}
