use glam::IVec3;
use serde::{Deserialize, Serialize};

/// A cell coordinate in the simulation grid. Identity is by value.
pub type GridPos = IVec3;

/// Index of a registered family in a [`crate::species::Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId(pub u16);

/// Index of registered leaves properties in a [`crate::species::Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeavesId(pub u16);

/// Index of a registered species in a [`crate::species::Registry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub u16);

/// The six axis directions of the grid.
///
/// The declaration order is the index order used by every per-direction
/// table in the crate (probability maps, cell arrays, side matrices).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub const HORIZONTALS: [Direction; 4] = [
        Direction::South,
        Direction::West,
        Direction::North,
        Direction::East,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Direction> {
        Self::ALL.get(index).copied()
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Unit offset of this direction. North is -Z, up is +Y.
    pub fn offset(self) -> IVec3 {
        match self {
            Direction::Down => IVec3::NEG_Y,
            Direction::Up => IVec3::Y,
            Direction::North => IVec3::NEG_Z,
            Direction::South => IVec3::Z,
            Direction::West => IVec3::NEG_X,
            Direction::East => IVec3::X,
        }
    }

    #[inline]
    pub fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Up | Direction::Down)
    }
}

/// Position one step away from `pos` in `dir`.
#[inline]
pub fn offset(pos: GridPos, dir: Direction) -> GridPos {
    pos + dir.offset()
}

/// Small stable hash of a coordinate, used where a species wants positional
/// variety that does not consume randomness.
pub fn coord_hash(pos: GridPos) -> u32 {
    let h = (pos.x.wrapping_mul(4111) ^ pos.y.wrapping_mul(271) ^ pos.z.wrapping_mul(3067)) as u32;
    (h ^ (h >> 13)).wrapping_mul(0x5bd1_e995) >> 16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.offset() + dir.opposite().offset(), IVec3::ZERO);
        }
    }

    #[test]
    fn index_round_trips_through_table_order() {
        for (i, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(dir.index(), i);
            assert_eq!(Direction::from_index(i), Some(*dir));
        }
        assert_eq!(Direction::from_index(6), None);
    }

    #[test]
    fn horizontals_exclude_vertical_axis() {
        assert!(Direction::HORIZONTALS.iter().all(|d| d.is_horizontal()));
        assert!(!Direction::Up.is_horizontal());
        assert!(!Direction::Down.is_horizontal());
    }

    #[test]
    fn coord_hash_is_stable() {
        let p = IVec3::new(12, 64, -7);
        assert_eq!(coord_hash(p), coord_hash(p));
        assert!(coord_hash(p) <= 0xFFFF);
    }
}
