//! Chunked pixel streaming over a link with a per-transfer size ceiling.
//!
//! A flush hands over one contiguous region of pixel bytes. The link (SPI
//! with DMA here) only accepts transfers up to a fixed size, so the region is
//! split into in-order, non-overlapping writes that cover it exactly once.
//! Consecutive writes are grouped into bursts of up to [`MAX_BURST`], and a
//! link sends each burst under one chip select. Nothing is kept between calls.

use core::fmt;
use core::ops::Range;

use embedded_hal::spi::{Operation, SpiDevice};

/// Transfers sent under one chip select. A full 240x280 frame at the DMA
/// ceiling is five.
pub const MAX_BURST: usize = 8;

/// Sink for raw pixel bytes.
pub trait PixelLink {
    type Error;

    /// Send `chunks` in order as one burst. Each chunk is one bounded
    /// transfer; there are never more than [`MAX_BURST`].
    fn write_burst(&mut self, chunks: &[&[u8]]) -> Result<(), Self::Error>;
}

/// Pixel link over an SPI device already switched into a RAM write.
pub struct SpiLink<'a, SD>(pub &'a mut SD);

impl<SD: SpiDevice<u8>> PixelLink for SpiLink<'_, SD> {
    type Error = SD::Error;

    fn write_burst(&mut self, chunks: &[&[u8]]) -> Result<(), Self::Error> {
        // many data chunks in one CS-asserted transaction
        let mut ops: heapless::Vec<Operation<'_, u8>, MAX_BURST> = heapless::Vec::new();
        for chunk in chunks {
            ops.push(Operation::Write(*chunk)).ok();
        }
        self.0.transaction(&mut ops)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TransportError<E> {
    /// The burst starting at `offset` failed; earlier bursts were already
    /// sent.
    Link { offset: usize, source: E },
    ZeroChunk,
}

impl<E: fmt::Debug> fmt::Display for TransportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Link { offset, source } => {
                write!(f, "link write failed at byte {}: {:?}", offset, source)
            }
            TransportError::ZeroChunk => f.write_str("chunk size must be at least one byte"),
        }
    }
}

/// Byte ranges of successive transfers, in buffer order.
#[derive(Clone, Debug)]
pub struct ChunkRanges {
    offset: usize,
    total: usize,
    chunk_size: usize,
}

impl Iterator for ChunkRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.total || self.chunk_size == 0 {
            return None;
        }
        let take = core::cmp::min(self.chunk_size, self.total - self.offset);
        let range = self.offset..self.offset + take;
        self.offset += take;
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.chunk_size == 0 {
            return (0, Some(0));
        }
        let left = (self.total - self.offset).div_ceil(self.chunk_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChunkRanges {}

/// Plan the transfers for `total` bytes. A zero chunk size yields nothing.
pub fn chunk_ranges(total: usize, chunk_size: usize) -> ChunkRanges {
    ChunkRanges {
        offset: 0,
        total,
        chunk_size,
    }
}

/// Stream `data` through `link`, at most `chunk_size` bytes per write.
///
/// Returns the number of writes issued. A failing burst aborts the stream;
/// the panel has already latched the earlier bursts, so the caller should
/// treat the region as garbage until it is redrawn.
pub fn write_chunked<L: PixelLink>(
    link: &mut L,
    data: &[u8],
    chunk_size: usize,
) -> Result<usize, TransportError<L::Error>> {
    if chunk_size == 0 {
        return Err(TransportError::ZeroChunk);
    }

    let mut writes = 0;
    let mut burst: heapless::Vec<&[u8], MAX_BURST> = heapless::Vec::new();
    let mut burst_start = 0;
    for range in chunk_ranges(data.len(), chunk_size) {
        if burst.is_full() {
            send_burst(link, &mut burst, burst_start)?;
            burst_start = range.start;
        }
        burst.push(&data[range]).ok();
        writes += 1;
    }
    if !burst.is_empty() {
        send_burst(link, &mut burst, burst_start)?;
    }
    Ok(writes)
}

fn send_burst<L: PixelLink>(
    link: &mut L,
    burst: &mut heapless::Vec<&[u8], MAX_BURST>,
    offset: usize,
) -> Result<(), TransportError<L::Error>> {
    link.write_burst(burst.as_slice())
        .map_err(|source| TransportError::Link { offset, source })?;
    burst.clear();
    Ok(())
}
