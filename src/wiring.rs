// Board pin mapping for the ESP32-S3 + 1.69" ST7789 (240x280) + CST816S
// module. Only compiled with the `esp32s3` feature.
//! The following wiring is assumed:
//! - LCD D/C   => GPIO4
//! - LCD CS    => GPIO5
//! - LCD SCK   => GPIO6
//! - LCD MOSI  => GPIO7
//! - LCD RST   => GPIO8
//! - LCD BL    => GPIO15 (LEDC PWM)
//! - Touch SCL => GPIO10
//! - Touch SDA => GPIO11
//! - Touch RST => GPIO13
//! - Touch INT => GPIO14 (open drain, low while a report is pending)
//! - GND => GND
//! - 3.3V => 3.3V

use esp_hal::{
    gpio::{Event, Input, InputConfig, Io, Level, Output, OutputConfig, Pull},
    peripherals::{
        Peripherals, DMA_CH0, GPIO10, GPIO11, GPIO15, GPIO6, GPIO7, I2C0, LEDC, SPI2,
    },
};

// Everything the panel bring-up consumes
pub struct DisplayPins<'a> {
    pub spi2: SPI2<'a>,
    pub dma_ch0: DMA_CH0<'a>,
    pub sck: GPIO6<'a>,
    pub mosi: GPIO7<'a>,
    pub cs: Output<'a>,
    pub dc: Output<'a>,
    pub rst: Output<'a>,
}

pub struct BacklightPins<'a> {
    pub ledc: LEDC<'a>,
    pub pin: GPIO15<'a>,
}

pub struct TouchPins<'a> {
    pub i2c0: I2C0<'a>,
    pub sda: GPIO11<'a>,
    pub scl: GPIO10<'a>,
    pub rst: Output<'a>,
    // listens for falling edges
    pub int: Input<'a>,
}

pub struct BoardPins<'a> {
    pub display: DisplayPins<'a>,
    pub backlight: BacklightPins<'a>,
    pub touch: TouchPins<'a>,
}

pub fn init_board_pins<'a>(p: Peripherals) -> (Io<'a>, BoardPins<'a>) {
    let io = Io::new(p.IO_MUX);

    // LCD control pins; SCK/MOSI are handed to the SPI driver as-is
    let cs = Output::new(p.GPIO5, Level::High, OutputConfig::default());
    let dc = Output::new(p.GPIO4, Level::Low, OutputConfig::default());
    let rst = Output::new(p.GPIO8, Level::High, OutputConfig::default());

    // touch controller; INT idles high
    let touch_rst = Output::new(p.GPIO13, Level::High, OutputConfig::default());
    let mut int = Input::new(p.GPIO14, InputConfig::default().with_pull(Pull::Up));
    int.listen(Event::FallingEdge);

    (
        io,
        BoardPins {
            display: DisplayPins {
                spi2: p.SPI2,
                dma_ch0: p.DMA_CH0,
                sck: p.GPIO6,
                mosi: p.GPIO7,
                cs,
                dc,
                rst,
            },
            backlight: BacklightPins { ledc: p.LEDC, pin: p.GPIO15 },
            touch: TouchPins {
                i2c0: p.I2C0,
                sda: p.GPIO11,
                scl: p.GPIO10,
                rst: touch_rst,
                int,
            },
        },
    )
}
