//! Tile grid navigation and the slide animation between tiles.

use embedded_graphics::prelude::Point;
use log::debug;

use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Direction of travel on the grid (toward the neighbour on that side).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Dir::Up => 1,
            Dir::Down => 2,
            Dir::Left => 4,
            Dir::Right => 8,
        }
    }
}

/// Set of allowed directions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dirs(u8);

impl Dirs {
    pub const NONE: Dirs = Dirs(0);
    pub const ALL: Dirs = Dirs(0x0F);

    pub const fn only(d: Dir) -> Dirs {
        Dirs(d.bit())
    }

    pub fn contains(self, d: Dir) -> bool {
        self.0 & d.bit() != 0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileId {
    pub col: u8,
    pub row: u8,
}

impl TileId {
    pub const fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    pub fn step(self, d: Dir) -> Option<TileId> {
        let (c, r) = (self.col as i16, self.row as i16);
        let (c, r) = match d {
            Dir::Up => (c, r - 1),
            Dir::Down => (c, r + 1),
            Dir::Left => (c - 1, r),
            Dir::Right => (c + 1, r),
        };
        if c < 0 || r < 0 {
            return None;
        }
        Some(TileId::new(c as u8, r as u8))
    }

    /// Top-left corner of this tile on the virtual tile plane.
    pub fn origin(self) -> Point {
        Point::new(
            self.col as i32 * SCREEN_WIDTH as i32,
            self.row as i32 * SCREEN_HEIGHT as i32,
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileKind {
    Dashboard,
    Top,
    StepsDetail,
    BatteryDetail,
    HeartRateDetail,
}

pub const CENTER: TileId = TileId::new(1, 1);
pub const TOP: TileId = TileId::new(1, 0);
pub const BOTTOM: TileId = TileId::new(1, 2);
pub const LEFT: TileId = TileId::new(0, 1);
pub const RIGHT: TileId = TileId::new(2, 1);

#[derive(Copy, Clone, Debug)]
pub struct Tile {
    pub id: TileId,
    pub kind: TileKind,
    pub dirs: Dirs,
}

/// The five populated cells of the 3x3 grid.
pub const TILES: [Tile; 5] = [
    Tile { id: CENTER, kind: TileKind::Dashboard, dirs: Dirs::ALL },
    Tile { id: TOP, kind: TileKind::Top, dirs: Dirs::only(Dir::Down) },
    Tile { id: BOTTOM, kind: TileKind::StepsDetail, dirs: Dirs::only(Dir::Up) },
    Tile { id: LEFT, kind: TileKind::BatteryDetail, dirs: Dirs::only(Dir::Right) },
    Tile { id: RIGHT, kind: TileKind::HeartRateDetail, dirs: Dirs::only(Dir::Left) },
];

pub fn tile(id: TileId) -> Option<&'static Tile> {
    TILES.iter().find(|t| t.id == id)
}

/// Neighbour reached from `from` in direction `d`, if the graph allows it.
pub fn neighbor(from: TileId, d: Dir) -> Option<TileId> {
    let t = tile(from)?;
    if !t.dirs.contains(d) {
        return None;
    }
    let to = from.step(d)?;
    tile(to).map(|t| t.id)
}

/// Ease-out cubic over `0..=1000` (per mille).
fn ease_out(permille: u32) -> u32 {
    let inv = 1000 - permille.min(1000) as u64;
    (1000 - inv * inv * inv / 1_000_000) as u32
}

#[derive(Copy, Clone, Debug)]
struct Slide {
    from: Point,
    to: TileId,
    start_ms: u64,
}

/// Which tile is showing and where the viewport sits while sliding.
pub struct Tileview {
    active: TileId,
    offset: Point,
    slide: Option<Slide>,
    duration_ms: u32,
}

impl Tileview {
    pub fn new(initial: TileId, duration_ms: u32) -> Self {
        Self {
            active: initial,
            offset: initial.origin(),
            slide: None,
            duration_ms,
        }
    }

    /// Tile navigation ends on; changes as soon as a slide starts.
    pub fn active(&self) -> TileId {
        self.active
    }

    pub fn is_animating(&self) -> bool {
        self.slide.is_some()
    }

    /// Viewport top-left on the tile plane.
    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Start a slide to `to`. Jumps straight there when `animate` is off or
    /// the duration is zero. Returns false when already heading there.
    pub fn set_tile(&mut self, to: TileId, animate: bool, now_ms: u64) -> bool {
        if to == self.active {
            return false;
        }
        debug!("tile ({},{}) -> ({},{})", self.active.col, self.active.row, to.col, to.row);
        self.active = to;
        if animate && self.duration_ms > 0 {
            self.slide = Some(Slide { from: self.offset, to, start_ms: now_ms });
        } else {
            self.slide = None;
            self.offset = to.origin();
        }
        true
    }

    /// Advance the slide. Returns true when the viewport moved.
    pub fn advance(&mut self, now_ms: u64) -> bool {
        let Some(s) = self.slide else {
            return false;
        };
        let elapsed = now_ms.saturating_sub(s.start_ms);
        let target = s.to.origin();

        let next = if elapsed >= self.duration_ms as u64 {
            self.slide = None;
            target
        } else {
            let k = ease_out((elapsed * 1000 / self.duration_ms as u64) as u32) as i32;
            s.from + (target - s.from) * k / 1000
        };

        let moved = next != self.offset;
        self.offset = next;
        moved
    }
}
