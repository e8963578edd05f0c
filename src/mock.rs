//! Host-side stand-ins for the board peripherals.
//!
//! Every mock can optionally append to a shared [`Timeline`] so tests can
//! check the relative order of panel commands, backlight writes and delays.

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_graphics::{prelude::Point, primitives::Rectangle};
use embedded_hal::{delay::DelayNs, digital, i2c, pwm, spi};

use crate::framebuffer::FlushSink;
use crate::panel::PanelPower;
use crate::touch::TouchController;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PanelCmd {
    SleepOut,
    DisplayOn,
    DisplayOff,
    SleepIn,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Duty(u8),
    Panel(PanelCmd),
    DelayMs(u32),
    Flush(Rectangle),
}

pub type Timeline = Rc<RefCell<Vec<Event>>>;

pub fn timeline() -> Timeline {
    Rc::new(RefCell::new(Vec::new()))
}

fn log(t: &Option<Timeline>, e: Event) {
    if let Some(t) = t {
        t.borrow_mut().push(e);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MockBusError;

impl spi::Error for MockBusError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl i2c::Error for MockBusError {
    fn kind(&self) -> i2c::ErrorKind {
        i2c::ErrorKind::Other
    }
}

// -------------------- PWM --------------------

pub struct MockPwm {
    raw: Vec<u8>,
    timeline: Option<Timeline>,
}

impl MockPwm {
    pub fn new() -> Self {
        Self { raw: Vec::new(), timeline: None }
    }

    pub fn on(timeline: &Timeline) -> Self {
        Self { raw: Vec::new(), timeline: Some(timeline.clone()) }
    }

    pub fn raw_levels(&self) -> Vec<u8> {
        self.raw.clone()
    }
}

impl pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.raw.push(duty as u8);
        log(&self.timeline, Event::Duty(duty as u8));
        Ok(())
    }
}

// -------------------- Delay --------------------

pub struct MockDelay {
    total_ns: u64,
    timeline: Option<Timeline>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self { total_ns: 0, timeline: None }
    }

    pub fn on(timeline: &Timeline) -> Self {
        Self { total_ns: 0, timeline: Some(timeline.clone()) }
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += ms as u64 * 1_000_000;
        log(&self.timeline, Event::DelayMs(ms));
    }
}

// -------------------- GPIO --------------------

/// Output pin whose level can be observed through clones of the same cell.
pub struct MockPin {
    level: Rc<Cell<bool>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self { level: Rc::new(Cell::new(false)) }
    }
}

impl digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        Ok(())
    }
}

// -------------------- SPI --------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpiOp {
    Cmd(u8),
    Data(Vec<u8>),
}

/// SPI device that sorts writes into commands and data by watching a D/C pin.
pub struct MockSpi {
    pub ops: Vec<SpiOp>,
    /// Writes per `transaction` call, i.e. per chip-select assertion.
    pub transactions: Vec<usize>,
    /// Fail the write that would become `ops[n]`.
    pub fail_after: Option<usize>,
    dc: Option<Rc<Cell<bool>>>,
}

impl MockSpi {
    pub fn with_dc(dc: &MockPin) -> Self {
        Self {
            ops: Vec::new(),
            transactions: Vec::new(),
            fail_after: None,
            dc: Some(dc.level.clone()),
        }
    }

    pub fn commands(&self) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SpiOp::Cmd(c) => Some(*c),
                SpiOp::Data(_) => None,
            })
            .collect()
    }
}

impl spi::ErrorType for MockSpi {
    type Error = MockBusError;
}

impl spi::SpiDevice<u8> for MockSpi {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        self.transactions.push(operations.len());
        for op in operations.iter() {
            if let spi::Operation::Write(bytes) = op {
                if self.fail_after == Some(self.ops.len()) {
                    return Err(MockBusError);
                }
                let command = matches!(&self.dc, Some(level) if !level.get());
                if command && bytes.len() == 1 {
                    self.ops.push(SpiOp::Cmd(bytes[0]));
                } else {
                    self.ops.push(SpiOp::Data(bytes.to_vec()));
                }
            }
        }
        Ok(())
    }
}

// -------------------- I2C --------------------

/// Register-file I2C target: a write sets the register pointer (and stores
/// any trailing bytes), a read returns bytes from the pointer onward.
pub struct MockI2c {
    pub regs: [u8; 256],
    pub writes: Vec<(u8, Vec<u8>)>,
    pub fail: bool,
    pointer: u8,
}

impl MockI2c {
    pub fn new() -> Self {
        Self { regs: [0; 256], writes: Vec::new(), fail: false, pointer: 0 }
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = MockBusError;
}

impl i2c::I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockBusError);
        }
        for op in operations.iter_mut() {
            match op {
                i2c::Operation::Write(bytes) => {
                    self.writes.push((address, bytes.to_vec()));
                    if let Some((reg, rest)) = bytes.split_first() {
                        self.pointer = *reg;
                        for (i, b) in rest.iter().enumerate() {
                            self.regs[(*reg as usize + i) & 0xFF] = *b;
                        }
                    }
                }
                i2c::Operation::Read(buf) => {
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = self.regs[(self.pointer as usize + i) & 0xFF];
                    }
                }
            }
        }
        Ok(())
    }
}

// -------------------- Panel --------------------

pub struct MockPanel {
    pub cmds: Vec<PanelCmd>,
    pub flushes: Vec<(Rectangle, usize)>,
    pub fail_flush: bool,
    timeline: Option<Timeline>,
}

impl MockPanel {
    pub fn new() -> Self {
        Self { cmds: Vec::new(), flushes: Vec::new(), fail_flush: false, timeline: None }
    }

    pub fn on(timeline: &Timeline) -> Self {
        Self { timeline: Some(timeline.clone()), ..Self::new() }
    }

    fn record(&mut self, cmd: PanelCmd) -> Result<(), MockBusError> {
        self.cmds.push(cmd);
        log(&self.timeline, Event::Panel(cmd));
        Ok(())
    }
}

impl PanelPower for MockPanel {
    type Error = MockBusError;

    fn sleep_out(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCmd::SleepOut)
    }

    fn display_on(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCmd::DisplayOn)
    }

    fn display_off(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCmd::DisplayOff)
    }

    fn sleep_in(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCmd::SleepIn)
    }
}

impl FlushSink for MockPanel {
    type Error = MockBusError;

    fn flush(&mut self, area: Rectangle, pixels: &[u8]) -> Result<(), Self::Error> {
        if self.fail_flush {
            return Err(MockBusError);
        }
        self.flushes.push((area, pixels.len()));
        log(&self.timeline, Event::Flush(area));
        Ok(())
    }
}

// -------------------- Touch --------------------

/// Scripted touch controller. Each `available()` consumes one entry;
/// an empty script reads as "no touch".
pub struct MockTouch {
    script: VecDeque<Result<Option<Point>, MockBusError>>,
    last: Point,
}

impl MockTouch {
    pub fn new() -> Self {
        Self { script: VecDeque::new(), last: Point::zero() }
    }

    pub fn press(&mut self, x: i32, y: i32) -> &mut Self {
        self.script.push_back(Ok(Some(Point::new(x, y))));
        self
    }

    pub fn release(&mut self) -> &mut Self {
        self.script.push_back(Ok(None));
        self
    }

    /// `n` polls with no finger down.
    pub fn idle(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.script.push_back(Ok(None));
        }
        self
    }

    pub fn fail(&mut self) -> &mut Self {
        self.script.push_back(Err(MockBusError));
        self
    }
}

impl TouchController for MockTouch {
    type Error = MockBusError;

    fn available(&mut self) -> Result<bool, Self::Error> {
        match self.script.pop_front() {
            Some(Ok(Some(p))) => {
                self.last = p;
                Ok(true)
            }
            Some(Ok(None)) | None => Ok(false),
            Some(Err(e)) => Err(e),
        }
    }

    fn last_point(&self) -> Point {
        self.last
    }
}
