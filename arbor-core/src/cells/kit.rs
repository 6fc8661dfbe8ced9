use glam::IVec3;

use crate::error::ConfigError;
use crate::grid::MAX_HYDRATION;

use super::{Cell, CellSolver, SideMatrix};

/// A box of hydration values describing the leaf mass grown around a twig.
///
/// Values are stored `y`-major, then `z`, then `x`. `center` is the cell of
/// the twig itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafCluster {
    size: IVec3,
    center: IVec3,
    data: Vec<u8>,
}

impl LeafCluster {
    /// Every dimension of `size` must be positive and `data` must hold
    /// exactly one value per cell.
    pub fn new(size: IVec3, center: IVec3, data: Vec<u8>) -> Result<Self, ConfigError> {
        let expected = size
            .to_array()
            .into_iter()
            .try_fold(1usize, |n, d| {
                usize::try_from(d).ok().filter(|&d| d > 0).and_then(|d| n.checked_mul(d))
            })
            .filter(|&n| i32::try_from(n).is_ok());
        let Some(expected) = expected else {
            return Err(ConfigError::InvalidLeafCluster {
                expected: 0,
                actual: data.len(),
            });
        };
        if data.len() != expected {
            return Err(ConfigError::InvalidLeafCluster {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { size, center, data })
    }

    /// Value at an offset relative to the center. Outside the box is 0.
    pub fn get(&self, rel: IVec3) -> u8 {
        let p = rel + self.center;
        if p.cmplt(IVec3::ZERO).any() || p.cmpge(self.size).any() {
            return 0;
        }
        self.data[((p.y * self.size.z + p.z) * self.size.x + p.x) as usize]
    }

    /// Offsets relative to the center whose value is non-zero, in storage order.
    pub fn non_zero(&self) -> impl Iterator<Item = (IVec3, u8)> + '_ {
        self.data.iter().enumerate().filter(|(_, v)| **v != 0).map(|(i, v)| {
            let i = i as i32;
            let x = i % self.size.x;
            let z = (i / self.size.x) % self.size.z;
            let y = i / (self.size.x * self.size.z);
            (IVec3::new(x, y, z) - self.center, *v)
        })
    }
}

static CONIFER_LEAF_SIDES: SideMatrix = [
    [0, 1, 2, 3, 4],
    [0, 0, 1, 2, 3],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
];

static ACACIA_LEAF_SIDES: SideMatrix = [
    [0, 0, 1, 2, 2],
    [0, 0, 1, 2, 2],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
];

static DARK_OAK_LEAF_SIDES: SideMatrix = [
    [0, 1, 1, 2, 3],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
    [0, 1, 2, 3, 4],
];

/// Hydration configuration for one leaves type.
#[derive(Clone, Debug, PartialEq)]
pub struct CellKit {
    name: String,
    solver: CellSolver,
    default_hydration: u8,
    leaf_cluster: LeafCluster,
    leaf_sides: Option<&'static SideMatrix>,
    branch_cell: Cell,
}

impl CellKit {
    /// Builds a kit with isotropic leaf cells and plain twig cells.
    pub fn new(
        name: impl Into<String>,
        solver: CellSolver,
        default_hydration: u8,
        leaf_cluster: LeafCluster,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if default_hydration == 0 || default_hydration > MAX_HYDRATION {
            return Err(ConfigError::InvalidHydration {
                kit: name,
                value: default_hydration,
            });
        }
        for &code in solver.codes() {
            let value = (code >> 8) & 0xF;
            let needed = (code >> 4) & 0xF;
            let result = (code & 0xF) as u8;
            if code > 0x0FFF || value == 0 || needed == 0 || needed > 6 || result > MAX_HYDRATION {
                return Err(ConfigError::InvalidSolverCode { kit: name, code });
            }
        }
        Ok(Self {
            name,
            solver,
            default_hydration,
            leaf_cluster,
            leaf_sides: None,
            branch_cell: Cell::Branch,
        })
    }

    pub fn with_leaf_sides(mut self, sides: &'static SideMatrix) -> Self {
        self.leaf_sides = Some(sides);
        self
    }

    pub fn with_branch_cell(mut self, cell: Cell) -> Self {
        self.branch_cell = cell;
        self
    }

    /// Looks up a built-in kit.
    pub fn by_name(name: &str) -> Option<CellKit> {
        match name {
            "deciduous" => Some(Self::deciduous()),
            "conifer" => Some(Self::conifer()),
            "acacia" => Some(Self::acacia()),
            "dark_oak" => Some(Self::dark_oak()),
            _ => None,
        }
    }

    pub fn deciduous() -> CellKit {
        Self::builtin("deciduous", &[0x0514, 0x0413, 0x0312, 0x0211], deciduous_cluster())
    }

    pub fn conifer() -> CellKit {
        Self::builtin(
            "conifer",
            &[0x0514, 0x0423, 0x0412, 0x0312, 0x0211],
            conifer_cluster(),
        )
        .with_leaf_sides(&CONIFER_LEAF_SIDES)
        .with_branch_cell(Cell::ConiferBranch)
    }

    pub fn acacia() -> CellKit {
        Self::builtin("acacia", &[0x0514, 0x0413, 0x0312, 0x0211], acacia_cluster())
            .with_leaf_sides(&ACACIA_LEAF_SIDES)
    }

    pub fn dark_oak() -> CellKit {
        Self::builtin(
            "dark_oak",
            &[0x0514, 0x0423, 0x0412, 0x0312, 0x0211],
            dark_oak_cluster(),
        )
        .with_leaf_sides(&DARK_OAK_LEAF_SIDES)
    }

    fn builtin(name: &str, codes: &[u16], cluster: LeafCluster) -> CellKit {
        Self {
            name: name.to_string(),
            solver: CellSolver::new(codes.to_vec()),
            default_hydration: MAX_HYDRATION,
            leaf_cluster: cluster,
            leaf_sides: None,
            branch_cell: Cell::Branch,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn solver(&self) -> &CellSolver {
        &self.solver
    }

    pub fn default_hydration(&self) -> u8 {
        self.default_hydration
    }

    pub fn leaf_cluster(&self) -> &LeafCluster {
        &self.leaf_cluster
    }

    pub fn cell_for_leaves(&self, hydration: u8) -> Cell {
        match self.leaf_sides {
            Some(sides) => Cell::Matrix {
                value: hydration,
                sides,
            },
            None => Cell::Normal(hydration),
        }
    }

    /// Only twigs feed leaves; thicker branches are inert.
    pub fn cell_for_branch(&self, radius: u8, twig_radius: u8) -> Cell {
        if radius == twig_radius {
            self.branch_cell
        } else {
            Cell::Null
        }
    }
}

// The built-in clusters are well formed by construction.
fn cluster(size: IVec3, center: IVec3, data: Vec<u8>) -> LeafCluster {
    LeafCluster { size, center, data }
}

#[rustfmt::skip]
fn deciduous_cluster() -> LeafCluster {
    cluster(IVec3::new(5, 4, 5), IVec3::new(2, 1, 2), vec![
        0, 0, 0, 0, 0,
        0, 1, 1, 1, 0,
        0, 1, 1, 1, 0,
        0, 1, 1, 1, 0,
        0, 0, 0, 0, 0,

        0, 1, 1, 1, 0,
        1, 3, 4, 3, 1,
        1, 4, 0, 4, 1,
        1, 3, 4, 3, 1,
        0, 1, 1, 1, 0,

        0, 1, 1, 1, 0,
        1, 2, 3, 2, 1,
        1, 3, 4, 3, 1,
        1, 2, 3, 2, 1,
        0, 1, 1, 1, 0,

        0, 0, 0, 0, 0,
        0, 1, 1, 1, 0,
        0, 1, 1, 1, 0,
        0, 1, 1, 1, 0,
        0, 0, 0, 0, 0,
    ])
}

#[rustfmt::skip]
fn conifer_cluster() -> LeafCluster {
    cluster(IVec3::new(5, 2, 5), IVec3::new(2, 0, 2), vec![
        0, 0, 1, 0, 0,
        0, 1, 2, 1, 0,
        1, 2, 0, 2, 1,
        0, 1, 2, 1, 0,
        0, 0, 1, 0, 0,

        0, 0, 0, 0, 0,
        0, 0, 1, 0, 0,
        0, 1, 1, 1, 0,
        0, 0, 1, 0, 0,
        0, 0, 0, 0, 0,
    ])
}

#[rustfmt::skip]
fn acacia_cluster() -> LeafCluster {
    cluster(IVec3::new(7, 2, 7), IVec3::new(3, 0, 3), vec![
        0, 0, 1, 1, 1, 0, 0,
        0, 1, 2, 2, 2, 1, 0,
        1, 2, 3, 4, 3, 2, 1,
        1, 2, 4, 0, 4, 2, 1,
        1, 2, 3, 4, 3, 2, 1,
        0, 1, 2, 2, 2, 1, 0,
        0, 0, 1, 1, 1, 0, 0,

        0, 0, 0, 0, 0, 0, 0,
        0, 0, 1, 1, 1, 0, 0,
        0, 1, 1, 2, 1, 1, 0,
        0, 1, 2, 3, 2, 1, 0,
        0, 1, 1, 2, 1, 1, 0,
        0, 0, 1, 1, 1, 0, 0,
        0, 0, 0, 0, 0, 0, 0,
    ])
}

#[rustfmt::skip]
fn dark_oak_cluster() -> LeafCluster {
    cluster(IVec3::new(7, 3, 7), IVec3::new(3, 1, 3), vec![
        0, 0, 0, 0, 0, 0, 0,
        0, 0, 1, 1, 1, 0, 0,
        0, 1, 1, 1, 1, 1, 0,
        0, 1, 1, 1, 1, 1, 0,
        0, 1, 1, 1, 1, 1, 0,
        0, 0, 1, 1, 1, 0, 0,
        0, 0, 0, 0, 0, 0, 0,

        0, 0, 1, 1, 1, 0, 0,
        0, 1, 2, 2, 2, 1, 0,
        1, 2, 3, 4, 3, 2, 1,
        1, 2, 4, 0, 4, 2, 1,
        1, 2, 3, 4, 3, 2, 1,
        0, 1, 2, 2, 2, 1, 0,
        0, 0, 1, 1, 1, 0, 0,

        0, 0, 0, 0, 0, 0, 0,
        0, 0, 1, 1, 1, 0, 0,
        0, 1, 2, 3, 2, 1, 0,
        0, 1, 3, 4, 3, 1, 0,
        0, 1, 2, 3, 2, 1, 0,
        0, 0, 1, 1, 1, 0, 0,
        0, 0, 0, 0, 0, 0, 0,
    ])
}
