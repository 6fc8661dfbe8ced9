//! Hydration automaton.
//!
//! A node's hydration is derived purely from the six cells around it. Each
//! neighbor is probed into a transient [`Cell`]; a [`CellSolver`] reduces the
//! six probes to one level in `0..=4`; a [`CellKit`] bundles the solver with
//! the cell shapes and leaf footprint of one leaves type.

mod kit;
mod solver;

pub use kit::{CellKit, LeafCluster};
pub use solver::{solve_hydration, CellSolver};

use crate::types::Direction;

/// Per-side remapping of a cell value, indexed `[side][value]`.
pub type SideMatrix = [[u8; 5]; 6];

/// Value a twig contributes to adjacent leaves.
pub const BRANCH_CELL_VALUE: u8 = 5;

const CONIFER_BRANCH_SIDES: [u8; 6] = [2, 2, 3, 3, 3, 3];

/// A transient probe of one neighbor's resource contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// Absent or incompatible neighbor.
    Null,
    /// Contributes its value equally to every side.
    Normal(u8),
    /// A twig. Contributes [`BRANCH_CELL_VALUE`] to every side.
    Branch,
    /// A conifer twig: weaker toward the vertical axis than sideways.
    ConiferBranch,
    /// Leaves whose contribution depends on which side is asking.
    Matrix {
        value: u8,
        sides: &'static SideMatrix,
    },
}

impl Cell {
    pub fn value(&self) -> u8 {
        match self {
            Cell::Null => 0,
            Cell::Normal(value) | Cell::Matrix { value, .. } => *value,
            Cell::Branch | Cell::ConiferBranch => BRANCH_CELL_VALUE,
        }
    }

    /// Contribution toward a neighbor touching this cell's `side`.
    pub fn value_from_side(&self, side: Direction) -> u8 {
        match self {
            Cell::Null => 0,
            Cell::Normal(value) => *value,
            Cell::Branch => BRANCH_CELL_VALUE,
            Cell::ConiferBranch => CONIFER_BRANCH_SIDES[side.index()],
            Cell::Matrix { value, sides } => sides[side.index()][(*value).min(4) as usize],
        }
    }
}
