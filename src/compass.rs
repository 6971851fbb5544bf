//! Compass geometry: the [`Angle`] type, 8-point [`Direction`]
//! quantization, and circular distance.
//!
//! ```text
//!              N (0)
//!     NW (315)   │   NE (45)
//!            \   │   /
//!   W (270) ─────┼───── E (90)
//!            /   │   \
//!     SW (225)   │   SE (135)
//!              S (180)
//! ```
//!
//! Each direction owns a 45° sector centred on its bearing. The sector
//! boundaries use a 22° half-sector offset (not 22.5°), so the window for
//! N is `338..=359` plus `0..=22`, NE is `23..=67`, and so on. Installed
//! puzzles are calibrated against these boundaries; keep them.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Degrees in a full turn.
pub const FULL_TURN: u16 = 360;

/// Width of one compass sector.
pub const SECTOR_WIDTH: u16 = 45;

/// Integer half-sector offset applied before quantization.
pub const SECTOR_OFFSET: u16 = 22;

// ---------------------------------------------------------------------------
// Angle
// ---------------------------------------------------------------------------

/// Integer compass angle in degrees, always within `0..=359`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(u16);

impl Angle {
    pub const MIN: Angle = Angle(0);
    pub const MAX: Angle = Angle(FULL_TURN - 1);

    /// Build an angle, wrapping values of 360 and above.
    pub const fn from_degrees(degrees: u16) -> Self {
        Self(degrees % FULL_TURN)
    }

    pub const fn degrees(self) -> u16 {
        self.0
    }

    /// Shortest distance around the circle to `other` (0–180).
    pub fn distance_to(self, other: Angle) -> u16 {
        circular_distance(self, other)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shortest distance between two angles, folding across 0°/360°.
///
/// `circular_distance(0, 359) == 1`, `circular_distance(0, 180) == 180`.
pub fn circular_distance(a: Angle, b: Angle) -> u16 {
    let diff = a.0.abs_diff(b.0);
    if diff > FULL_TURN / 2 {
        FULL_TURN - diff
    } else {
        diff
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the 8 compass sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    N = 0,
    NE = 1,
    E = 2,
    SE = 3,
    S = 4,
    SW = 5,
    W = 6,
    NW = 7,
}

/// Sector index → direction.
const SECTORS: [Direction; Direction::COUNT] = [
    Direction::N,
    Direction::NE,
    Direction::E,
    Direction::SE,
    Direction::S,
    Direction::SW,
    Direction::W,
    Direction::NW,
];

/// Sector index → wire name.
const NAMES: [&str; Direction::COUNT] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

impl Direction {
    /// Total number of sectors.
    pub const COUNT: usize = 8;

    /// Quantize an angle into its compass sector.
    pub fn classify(angle: Angle) -> Self {
        let index = (angle.degrees() + SECTOR_OFFSET) % FULL_TURN / SECTOR_WIDTH;
        SECTORS[index as usize]
    }

    /// Short name as published on the wire ("N", "NE", …).
    pub fn as_str(self) -> &'static str {
        NAMES[self as usize]
    }

    /// Nominal bearing at the centre of the sector.
    pub fn bearing(self) -> Angle {
        Angle::from_degrees(self as u16 * SECTOR_WIDTH)
    }

    /// Every direction, clockwise from north.
    pub fn all() -> [Direction; Direction::COUNT] {
        SECTORS
    }
}

impl From<Angle> for Direction {
    fn from(angle: Angle) -> Self {
        Self::classify(angle)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
