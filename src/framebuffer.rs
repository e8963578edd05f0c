//! Full-screen RGB565 framebuffer with dirty-band tracking.
//!
//! Widgets mark what changed through [`Invalidate`]; [`FrameBuffer::refresh`]
//! redraws only those regions and hands each one to a [`FlushSink`]. Dirty
//! areas are widened to whole rows ("bands") so every flushed region is one
//! contiguous slice of the framebuffer, which is what the chunked pixel
//! stream wants.

use core::convert::Infallible;
use core::fmt;

use embedded_graphics::{
    pixelcolor::{raw::RawU16, Rgb565},
    prelude::*,
    primitives::Rectangle,
};
use log::warn;

// Distinct dirty bands kept before everything collapses into one.
const MAX_BANDS: usize = 8;

/// Receives rendered regions, typically the panel driver.
pub trait FlushSink {
    type Error: fmt::Debug;

    /// `pixels` holds `area` row by row as big-endian RGB565.
    fn flush(&mut self, area: Rectangle, pixels: &[u8]) -> Result<(), Self::Error>;
}

/// Marks a screen area as needing a redraw.
pub trait Invalidate {
    fn invalidate(&mut self, area: Rectangle);
}

/// Something that can paint the whole screen; refresh clips it per band.
pub trait Scene {
    fn draw<D>(&self, target: &mut D)
    where
        D: DrawTarget<Color = Rgb565>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Band {
    pub top: u16,
    /// Exclusive.
    pub bottom: u16,
}

impl Band {
    fn touches(&self, other: &Band) -> bool {
        self.top <= other.bottom && other.top <= self.bottom
    }

    fn union(self, other: Band) -> Band {
        Band {
            top: self.top.min(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FrameBufferError {
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for FrameBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameBufferError::SizeMismatch { expected, actual } => {
                write!(f, "framebuffer holds {} pixels, expected {}", actual, expected)
            }
        }
    }
}

/// Outcome of one refresh pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub flushed: usize,
    pub failed: usize,
}

pub struct FrameBuffer<'fb> {
    fb: &'fb mut [u16], // pixels stored big-endian
    w: u16,
    h: u16,
    dirty: heapless::Vec<Band, MAX_BANDS>,
}

impl<'fb> FrameBuffer<'fb> {
    /// Wrap `fb` (exactly `w * h` pixels). The whole screen starts dirty.
    pub fn new(fb: &'fb mut [u16], w: u16, h: u16) -> Result<Self, FrameBufferError> {
        let expected = (w as usize) * (h as usize);
        if fb.len() != expected {
            return Err(FrameBufferError::SizeMismatch {
                expected,
                actual: fb.len(),
            });
        }
        fb.fill(0);

        let mut this = Self {
            fb,
            w,
            h,
            dirty: heapless::Vec::new(),
        };
        this.invalidate_all();
        Ok(this)
    }

    pub fn invalidate_all(&mut self) {
        self.dirty.clear();
        let _ = self.dirty.push(Band { top: 0, bottom: self.h });
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_bands(&self) -> &[Band] {
        &self.dirty
    }

    pub fn pixel(&self, p: Point) -> Option<Rgb565> {
        if p.x < 0 || p.y < 0 || p.x >= self.w as i32 || p.y >= self.h as i32 {
            return None;
        }
        let v = self.fb[(p.y as usize) * (self.w as usize) + (p.x as usize)];
        Some(RawU16::new(u16::from_be(v)).into())
    }

    fn band_rect(&self, band: Band) -> Rectangle {
        Rectangle::new(
            Point::new(0, band.top as i32),
            Size::new(self.w as u32, (band.bottom - band.top) as u32),
        )
    }

    fn band_bytes(&self, band: Band) -> &[u8] {
        let w = self.w as usize;
        bytemuck::cast_slice(&self.fb[(band.top as usize) * w..(band.bottom as usize) * w])
    }

    /// Redraw every dirty band from `scene` and push it to `sink`.
    ///
    /// A band whose flush fails is not retried here; it stays dirty so the
    /// next refresh sends it again.
    pub fn refresh<S, F>(&mut self, scene: &S, sink: &mut F) -> RefreshReport
    where
        S: Scene,
        F: FlushSink,
    {
        let bands = core::mem::take(&mut self.dirty);
        let mut report = RefreshReport::default();

        for band in bands.iter().copied() {
            let rect = self.band_rect(band);
            scene.draw(&mut self.clipped(&rect));

            match sink.flush(rect, self.band_bytes(band)) {
                Ok(()) => report.flushed += 1,
                Err(e) => {
                    warn!("flush of rows {}..{} dropped: {:?}", band.top, band.bottom, e);
                    report.failed += 1;
                    self.invalidate(rect);
                }
            }
        }
        report
    }
}

impl Invalidate for FrameBuffer<'_> {
    fn invalidate(&mut self, area: Rectangle) {
        let area = area.intersection(&self.bounding_box());
        let Some(br) = area.bottom_right() else {
            return;
        };
        let mut band = Band {
            top: area.top_left.y as u16,
            bottom: br.y as u16 + 1,
        };

        // absorb every band the new one touches, repeat until stable
        let mut i = 0;
        while i < self.dirty.len() {
            if self.dirty[i].touches(&band) {
                band = band.union(self.dirty.swap_remove(i));
                i = 0;
            } else {
                i += 1;
            }
        }

        if self.dirty.push(band).is_err() {
            let all = self.dirty.iter().fold(band, |acc, b| acc.union(*b));
            self.dirty.clear();
            let _ = self.dirty.push(all);
        }
    }
}

// -------------------- embedded-graphics integration --------------------
impl OriginDimensions for FrameBuffer<'_> {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for FrameBuffer<'_> {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Rgb565>>,
    {
        let (w, h) = (self.w as i32, self.h as i32);
        for Pixel(p, c) in pixels {
            if p.x < 0 || p.y < 0 || p.x >= w || p.y >= h {
                continue;
            }
            self.fb[(p.y * w + p.x) as usize] = c.into_storage().to_be();
        }
        Ok(())
    }

    // FAST PATH: row fills for backgrounds and panels
    fn fill_solid(&mut self, area: &Rectangle, color: Rgb565) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return Ok(());
        }
        let fbw = self.w as usize;
        let x0 = area.top_left.x as usize;
        let row_w = area.size.width as usize;
        let v = color.into_storage().to_be();
        for y in area.rows() {
            let base = (y as usize) * fbw + x0;
            self.fb[base..base + row_w].fill(v);
        }
        Ok(())
    }
}
