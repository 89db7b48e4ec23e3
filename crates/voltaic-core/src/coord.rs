//! Integer 3D coordinates and facings.
//!
//! Pure helpers used by block behaviors to work out which neighboring
//! coordinates to read. Axis convention: north is +x, west is +z, up is +y.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// A position in the block grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    pub const ORIGIN: Coord = Coord::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The adjacent coordinate in a single direction. `None` for [`Facing::Omni`]
    /// and past the edge of the `i32` grid.
    pub fn offset(self, facing: Facing) -> Option<Coord> {
        facing.offset().and_then(|delta| self.checked_add(delta))
    }

    /// All coordinates the facing covers: one for a direction, six for omni.
    pub fn adjacent(self, facing: Facing) -> impl Iterator<Item = Coord> {
        facing
            .offsets()
            .iter()
            .filter_map(move |&delta| self.checked_add(delta))
    }

    pub fn checked_add(self, rhs: Coord) -> Option<Coord> {
        Some(Coord::new(
            self.x.checked_add(rhs.x)?,
            self.y.checked_add(rhs.y)?,
            self.z.checked_add(rhs.z)?,
        ))
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &Coord) -> u32 {
        (self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs()
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<(i32, i32, i32)> for Coord {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

impl From<[i32; 3]> for Coord {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

/// Direction a block faces, or the omnidirectional marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North,
    South,
    East,
    West,
    Up,
    Down,
    Omni,
}

const NORTH: Coord = Coord::new(1, 0, 0);
const SOUTH: Coord = Coord::new(-1, 0, 0);
const EAST: Coord = Coord::new(0, 0, -1);
const WEST: Coord = Coord::new(0, 0, 1);
const UP: Coord = Coord::new(0, 1, 0);
const DOWN: Coord = Coord::new(0, -1, 0);

const ALL_OFFSETS: [Coord; 6] = [NORTH, SOUTH, EAST, WEST, UP, DOWN];

impl Facing {
    /// The six concrete directions, in offset order.
    pub const DIRECTIONS: [Facing; 6] = [
        Facing::North,
        Facing::South,
        Facing::East,
        Facing::West,
        Facing::Up,
        Facing::Down,
    ];

    /// Unit delta for a single direction. `None` for omni.
    pub fn offset(self) -> Option<Coord> {
        match self {
            Facing::North => Some(NORTH),
            Facing::South => Some(SOUTH),
            Facing::East => Some(EAST),
            Facing::West => Some(WEST),
            Facing::Up => Some(UP),
            Facing::Down => Some(DOWN),
            Facing::Omni => None,
        }
    }

    /// Every delta this facing matches. Omni matches all six.
    pub fn offsets(self) -> &'static [Coord] {
        match self {
            Facing::North => &ALL_OFFSETS[0..1],
            Facing::South => &ALL_OFFSETS[1..2],
            Facing::East => &ALL_OFFSETS[2..3],
            Facing::West => &ALL_OFFSETS[3..4],
            Facing::Up => &ALL_OFFSETS[4..5],
            Facing::Down => &ALL_OFFSETS[5..6],
            Facing::Omni => &ALL_OFFSETS,
        }
    }

    /// The opposite facing. Omni is its own reciprocal.
    pub fn reciprocal(self) -> Facing {
        match self {
            Facing::North => Facing::South,
            Facing::South => Facing::North,
            Facing::East => Facing::West,
            Facing::West => Facing::East,
            Facing::Up => Facing::Down,
            Facing::Down => Facing::Up,
            Facing::Omni => Facing::Omni,
        }
    }

    pub fn is_omni(self) -> bool {
        self == Facing::Omni
    }

    /// True if `self` covers the delta `delta` (omni covers every unit delta).
    pub fn matches(self, delta: Coord) -> bool {
        self.offsets().contains(&delta)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facing::North => "north",
            Facing::South => "south",
            Facing::East => "east",
            Facing::West => "west",
            Facing::Up => "up",
            Facing::Down => "down",
            Facing::Omni => "omni",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a facing name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid facing '{0}'")]
pub struct ParseFacingError(pub String);

impl FromStr for Facing {
    type Err = ParseFacingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "north" => Ok(Facing::North),
            "south" => Ok(Facing::South),
            "east" => Ok(Facing::East),
            "west" => Ok(Facing::West),
            "up" => Ok(Facing::Up),
            "down" => Ok(Facing::Down),
            "omni" => Ok(Facing::Omni),
            other => Err(ParseFacingError(other.to_string())),
        }
    }
}
