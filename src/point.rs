//! Integer points and octant classification.

use std::fmt;

/// A point in integer 3-space.
///
/// Points order lexicographically by `x`, then `y`, then `z`. The field
/// declaration order is what the derived `Ord` relies on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Point {
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance, saturating at `u64::MAX`.
    pub fn manhattan(&self, other: &Point) -> u64 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.y.abs_diff(other.y))
            .saturating_add(self.z.abs_diff(other.z))
    }
}

impl From<(i64, i64, i64)> for Point {
    #[inline]
    fn from((x, y, z): (i64, i64, i64)) -> Self {
        Self { x, y, z }
    }
}

impl From<[i64; 3]> for Point {
    #[inline]
    fn from([x, y, z]: [i64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// =============================================================================
// Octant codes
// =============================================================================

/// One of the eight child slots of a node, as a 3-bit code.
///
/// - Bit 2: `point.x >= key.x`
/// - Bit 1: `point.y >= key.y`
/// - Bit 0: `point.z >= key.z`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Octant(u8);

impl Octant {
    pub const COUNT: usize = 8;

    const X_BIT: u8 = 0b100;
    const Y_BIT: u8 = 0b010;
    const Z_BIT: u8 = 0b001;

    /// Classify `point` relative to `key`.
    ///
    /// Returns `None` when the two are equal: an equal key is an overwrite
    /// target, never a step down the tree.
    #[inline]
    pub fn of(key: &Point, point: &Point) -> Option<Octant> {
        (key != point).then(|| Self::classify(key, point))
    }

    /// Apply the bit rules without the equality check. An equal point lands
    /// in the all-upper octant.
    #[inline]
    pub fn classify(key: &Point, point: &Point) -> Octant {
        let mut code = 0u8;
        if point.x >= key.x {
            code |= Self::X_BIT;
        }
        if point.y >= key.y {
            code |= Self::Y_BIT;
        }
        if point.z >= key.z {
            code |= Self::Z_BIT;
        }
        Octant(code)
    }

    /// Build an octant from a raw code. Returns `None` for codes above 7.
    #[inline]
    pub fn from_code(code: u8) -> Option<Octant> {
        (usize::from(code) < Self::COUNT).then_some(Octant(code))
    }

    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// All eight octants in code order.
    pub fn all() -> impl Iterator<Item = Octant> {
        (0..Self::COUNT as u8).map(Octant)
    }
}
