/// Grid addressing: tile coordinates, packed keys, rectangular regions.
///
/// Every positional lookup (walls, triggers) goes through `GridKey`.
/// Coordinates are tile units; pixels only exist inside the movement
/// engine and are converted with `TILE_SIZE`. Pixels are `i64` so every
/// tile of the `i32` plane has a representable pixel position.
///
/// ## Key packing
///
///   key = (x as u32) << 32 | (y as u32)
///
/// Both halves keep the two's-complement bit pattern of the signed value,
/// so the mapping is a bijection over the whole `i32 × i32` plane.

use std::fmt;

use super::direction::Direction;

/// Edge length of one tile, in pixels (sub-units of a step).
pub const TILE_SIZE: i32 = 16;

/// Signed tile coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        GridCoord { x, y }
    }

    /// Tile containing the pixel `(px, py)`. Floors toward negative
    /// infinity; pixels beyond the plane clamp to its edge tile.
    pub fn from_pixel(px: i64, py: i64) -> Self {
        GridCoord {
            x: pixel_to_tile(px),
            y: pixel_to_tile(py),
        }
    }

    /// Top-left pixel of this tile.
    pub fn to_pixel(self) -> (i64, i64) {
        let size = i64::from(TILE_SIZE);
        (i64::from(self.x) * size, i64::from(self.y) * size)
    }

    /// Neighbouring tile one step in `dir`, or `None` past the edge of
    /// the `i32` plane. `Direction::None` returns self.
    pub fn offset(self, dir: Direction) -> Option<Self> {
        let (dx, dy) = dir.delta();
        Some(GridCoord {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    /// The orthogonal neighbours that exist (up to four).
    pub fn neighbors(self) -> impl Iterator<Item = GridCoord> {
        Direction::CARDINAL.into_iter().filter_map(move |d| self.offset(d))
    }

    #[inline]
    pub fn key(self) -> GridKey {
        GridKey::pack(self)
    }
}

fn pixel_to_tile(p: i64) -> i32 {
    let tile = p.div_euclid(i64::from(TILE_SIZE));
    tile.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((x, y): (i32, i32)) -> Self {
        GridCoord { x, y }
    }
}

/// Packed, collision-free key for a `GridCoord`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct GridKey(u64);

impl GridKey {
    #[inline]
    pub fn pack(c: GridCoord) -> Self {
        GridKey(((c.x as u32 as u64) << 32) | (c.y as u32 as u64))
    }

    #[inline]
    pub fn unpack(self) -> GridCoord {
        GridCoord {
            x: (self.0 >> 32) as u32 as i32,
            y: self.0 as u32 as i32,
        }
    }
}

impl From<GridCoord> for GridKey {
    fn from(c: GridCoord) -> Self {
        GridKey::pack(c)
    }
}

/// Inclusive rectangle of tiles. Corners are normalized on construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Region {
    pub min: GridCoord,
    pub max: GridCoord,
}

impl Region {
    pub fn new(a: GridCoord, b: GridCoord) -> Self {
        Region {
            min: GridCoord::new(a.x.min(b.x), a.y.min(b.y)),
            max: GridCoord::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Region::new(GridCoord::new(x1, y1), GridCoord::new(x2, y2))
    }

    pub fn contains(&self, c: GridCoord) -> bool {
        c.x >= self.min.x && c.x <= self.max.x && c.y >= self.min.y && c.y <= self.max.y
    }

    /// Number of tiles covered (both corners inclusive).
    pub fn area(&self) -> u64 {
        let w = (self.max.x as i64 - self.min.x as i64 + 1) as u64;
        let h = (self.max.y as i64 - self.min.y as i64 + 1) as u64;
        w * h
    }

    /// Every tile in the region, column by column.
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> {
        let (min, max) = (self.min, self.max);
        (min.x..=max.x).flat_map(move |x| (min.y..=max.y).map(move |y| GridCoord::new(x, y)))
    }
}

/// Where a map-authoring call applies: one tile or an inclusive rectangle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Placement {
    Point(GridCoord),
    Region(Region),
}

impl Placement {
    pub fn cells(&self) -> Box<dyn Iterator<Item = GridCoord>> {
        match *self {
            Placement::Point(c) => Box::new(std::iter::once(c)),
            Placement::Region(r) => Box::new(r.cells()),
        }
    }
}

impl From<GridCoord> for Placement {
    fn from(c: GridCoord) -> Self {
        Placement::Point(c)
    }
}

impl From<Region> for Placement {
    fn from(r: Region) -> Self {
        Placement::Region(r)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
