use crate::grid::{read_occupant, Grid, Occupant, MAX_HYDRATION};
use crate::species::LeavesProperties;
use crate::types::{offset, Direction, GridPos};

use super::Cell;

/// Reduces six neighbor cells to one hydration level.
///
/// The solver is a list of codes `0x0VCR`, tried in order: if at least `C`
/// neighbors contribute value `V` toward the center, the result is `R`. When
/// no code matches the result is 0. The solve is a pure function of its
/// inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellSolver {
    codes: Vec<u16>,
}

impl CellSolver {
    pub fn new(codes: impl Into<Vec<u16>>) -> Self {
        Self {
            codes: codes.into(),
        }
    }

    pub fn codes(&self) -> &[u16] {
        &self.codes
    }

    /// `cells[d]` is the neighbor lying in direction `d` from the center.
    pub fn solve(&self, cells: &[Cell; 6]) -> u8 {
        let mut counts = [0u8; 16];
        for dir in Direction::ALL {
            let value = cells[dir.index()].value_from_side(dir.opposite()).min(15);
            counts[value as usize] += 1;
        }

        for &code in &self.codes {
            let value = ((code >> 8) & 0xF) as usize;
            let needed = ((code >> 4) & 0xF) as u8;
            if value > 0 && counts[value] >= needed {
                return ((code & 0xF) as u8).min(MAX_HYDRATION);
            }
        }
        0
    }
}

/// Probes the six neighbors of `pos` for `leaves` and solves its hydration.
///
/// Only leaves of the same type and twigs of the leaves' family contribute;
/// everything else, including unloaded cells, is [`Cell::Null`].
pub fn solve_hydration<G: Grid + ?Sized>(grid: &G, pos: GridPos, leaves: &LeavesProperties) -> u8 {
    let kit = leaves.cell_kit();
    let family = leaves.family();

    let cells = Direction::ALL.map(|dir| match read_occupant(&*grid, offset(pos, dir)) {
        Occupant::Leaves {
            leaves: id,
            hydration,
        } if id == leaves.id() => kit.cell_for_leaves(hydration),
        Occupant::Branch { family: f, radius } if f == family.id => {
            kit.cell_for_branch(radius, family.primary_thickness)
        }
        _ => Cell::Null,
    });

    kit.solver().solve(&cells)
}
