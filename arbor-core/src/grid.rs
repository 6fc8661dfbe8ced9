//! The grid capability every engine reads and mutates, plus an in-memory
//! implementation.
//!
//! Engines never talk to a concrete world type. They go through [`Grid`], and
//! through [`read_occupant`] whenever the read must tolerate unloaded cells or
//! transiently inconsistent state.

use std::collections::HashMap;

use glam::IVec3;

use crate::types::{offset, Direction, FamilyId, GridPos, LeavesId, SpeciesId};

/// Hydration of fully watered leaves. Hydration 0 means the leaves are gone.
pub const MAX_HYDRATION: u8 = 4;

/// What occupies one grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Occupant {
    #[default]
    Air,
    Branch {
        family: FamilyId,
        radius: u8,
    },
    Leaves {
        leaves: LeavesId,
        hydration: u8,
    },
    /// Soil a tree is rooted in. Carries the species of the tree above it.
    Root {
        species: SpeciesId,
    },
    Liquid,
    Solid,
}

impl Occupant {
    #[inline]
    pub fn is_air(&self) -> bool {
        matches!(self, Occupant::Air)
    }

    /// Branches, leaves and roots.
    #[inline]
    pub fn is_tree_part(&self) -> bool {
        matches!(
            self,
            Occupant::Branch { .. } | Occupant::Leaves { .. } | Occupant::Root { .. }
        )
    }

    pub fn branch_radius(&self) -> Option<u8> {
        match self {
            Occupant::Branch { radius, .. } => Some(*radius),
            _ => None,
        }
    }

    pub fn is_branch_of(&self, family: FamilyId) -> bool {
        matches!(self, Occupant::Branch { family: f, .. } if *f == family)
    }

    pub fn is_leaves_of(&self, leaves: LeavesId) -> bool {
        matches!(self, Occupant::Leaves { leaves: l, .. } if *l == leaves)
    }
}

/// Read/write access to grid occupancy.
///
/// Implementors are owned by the caller for the duration of one traversal and
/// are never mutated concurrently.
pub trait Grid {
    fn occupant_at(&self, pos: GridPos) -> Occupant;

    fn set_occupant(&mut self, pos: GridPos, occupant: Occupant);

    fn clear_occupant(&mut self, pos: GridPos) {
        self.set_occupant(pos, Occupant::Air);
    }

    /// Whether `pos` can be read without touching unloaded storage.
    fn is_accessible(&self, pos: GridPos) -> bool;

    /// Whether every cell within `radius` of `pos` (a cube) is accessible.
    fn is_region_loaded(&self, pos: GridPos, radius: i32) -> bool {
        (-radius..=radius).all(|dx| {
            (-radius..=radius).all(|dy| {
                (-radius..=radius).all(|dz| self.is_accessible(pos + IVec3::new(dx, dy, dz)))
            })
        })
    }

    /// Sky light level in `0..=15`.
    fn sky_light(&self, _pos: GridPos) -> u8 {
        15
    }

    fn can_see_sky(&self, _pos: GridPos) -> bool {
        true
    }

    /// Environmental multiplier growth logic may apply to energy and heights.
    fn suitability(&self, _pos: GridPos) -> f32 {
        1.0
    }
}

/// Reads `pos`, treating unreadable or invalid cells as air.
///
/// Branches with radius 0 and leaves with hydration 0 violate the data model;
/// they are logged and reported as absent so a walk can carry on.
pub fn read_occupant<G: Grid + ?Sized>(grid: &G, pos: GridPos) -> Occupant {
    if !grid.is_accessible(pos) {
        return Occupant::Air;
    }
    match grid.occupant_at(pos) {
        Occupant::Branch { radius: 0, family } => {
            tracing::warn!(?pos, ?family, "branch with radius 0, treating as absent");
            Occupant::Air
        }
        Occupant::Leaves { hydration: 0, leaves } => {
            tracing::warn!(?pos, ?leaves, "leaves with hydration 0, treating as absent");
            Occupant::Air
        }
        occupant => occupant,
    }
}

/// Sparse in-memory grid. Cells not stored are air.
///
/// With `bounds` set, anything outside the inclusive box behaves as unloaded.
#[derive(Clone, Debug, Default)]
pub struct VoxelGrid {
    cells: HashMap<GridPos, Occupant>,
    bounds: Option<(GridPos, GridPos)>,
    sky_height: i32,
}

impl VoxelGrid {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
            bounds: None,
            sky_height: 256,
        }
    }

    pub fn with_bounds(min: GridPos, max: GridPos) -> Self {
        Self {
            bounds: Some((min, max)),
            sky_height: max.y,
            ..Self::new()
        }
    }

    /// Fills a horizontal square of `Solid` at height `y`.
    pub fn fill_ground(&mut self, y: i32, half_extent: i32) {
        for x in -half_extent..=half_extent {
            for z in -half_extent..=half_extent {
                self.set_occupant(IVec3::new(x, y, z), Occupant::Solid);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Stored cells sorted by position, so callers get a deterministic order.
    pub fn sorted_cells(&self) -> Vec<(GridPos, Occupant)> {
        let mut cells: Vec<_> = self.cells.iter().map(|(p, o)| (*p, *o)).collect();
        cells.sort_by_key(|(p, _)| (p.y, p.x, p.z));
        cells
    }

    /// Positions of every leaves cell, sorted like [`VoxelGrid::sorted_cells`].
    pub fn leaves_positions(&self) -> Vec<GridPos> {
        self.sorted_cells()
            .into_iter()
            .filter(|(_, o)| matches!(o, Occupant::Leaves { .. }))
            .map(|(p, _)| p)
            .collect()
    }

    pub fn count_branches(&self, family: FamilyId) -> usize {
        self.cells.values().filter(|o| o.is_branch_of(family)).count()
    }
}

impl Grid for VoxelGrid {
    fn occupant_at(&self, pos: GridPos) -> Occupant {
        self.cells.get(&pos).copied().unwrap_or_default()
    }

    fn set_occupant(&mut self, pos: GridPos, occupant: Occupant) {
        if occupant.is_air() {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, occupant);
        }
    }

    fn is_accessible(&self, pos: GridPos) -> bool {
        match self.bounds {
            Some((min, max)) => pos.cmpge(min).all() && pos.cmple(max).all(),
            None => true,
        }
    }

    fn can_see_sky(&self, pos: GridPos) -> bool {
        (pos.y + 1..=self.sky_height).all(|y| self.occupant_at(IVec3::new(pos.x, y, pos.z)).is_air())
    }

    /// Each tree part overhead shades by one level, anything solid blocks the sky.
    fn sky_light(&self, pos: GridPos) -> u8 {
        let mut light: u8 = 15;
        let mut above = offset(pos, Direction::Up);
        while above.y <= self.sky_height && light > 0 {
            match self.occupant_at(above) {
                Occupant::Air => {}
                Occupant::Solid => return 0,
                _ => light -= 1,
            }
            above = offset(above, Direction::Up);
        }
        light
    }
}
