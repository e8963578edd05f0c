//! Departure board data: a fixed list of flights shown one at a time.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RgbColor;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlightStatus {
    OnTime,
    Boarding,
    Delayed,
    Departed,
    Cancelled,
}

impl FlightStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FlightStatus::OnTime => "ON TIME",
            FlightStatus::Boarding => "BOARDING",
            FlightStatus::Delayed => "DELAYED",
            FlightStatus::Departed => "DEPARTED",
            FlightStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn color(self) -> Rgb565 {
        match self {
            FlightStatus::OnTime => Rgb565::GREEN,
            FlightStatus::Boarding => Rgb565::CYAN,
            FlightStatus::Delayed => Rgb565::YELLOW,
            FlightStatus::Departed => Rgb565::new(21, 42, 21),
            FlightStatus::Cancelled => Rgb565::RED,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlightRecord {
    pub time: &'static str,
    pub destination: &'static str,
    pub status: FlightStatus,
}

pub const FLIGHTS: [FlightRecord; 5] = [
    FlightRecord { time: "08:15", destination: "TOKYO HND", status: FlightStatus::OnTime },
    FlightRecord { time: "09:40", destination: "SEOUL ICN", status: FlightStatus::Boarding },
    FlightRecord { time: "11:05", destination: "SINGAPORE", status: FlightStatus::Delayed },
    FlightRecord { time: "13:30", destination: "HONOLULU", status: FlightStatus::Departed },
    FlightRecord { time: "16:50", destination: "LONDON LHR", status: FlightStatus::Cancelled },
];

/// Cyclic cursor over [`FLIGHTS`].
#[derive(Copy, Clone, Debug, Default)]
pub struct FlightBoard {
    idx: usize,
}

impl FlightBoard {
    pub fn new() -> Self {
        Self { idx: 0 }
    }

    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn current(&self) -> &'static FlightRecord {
        &FLIGHTS[self.idx]
    }

    /// Next record, wrapping after the last one.
    pub fn advance(&mut self) -> &'static FlightRecord {
        self.idx = (self.idx + 1) % FLIGHTS.len();
        self.current()
    }
}
