//! Cutting branches off a tree.
//!
//! [`compute_destruction_snapshot`] removes everything that hangs off a cut
//! and returns it as a [`BranchDestructionData`], positioned relative to the
//! cut so a collapse renderer can rebuild the piece anywhere.

use glam::IVec3;
use serde::Serialize;

use crate::grid::{read_occupant, Grid, Occupant};
use crate::network::{
    Collector, Destroyer, Inspector, MapSignal, NetVolume, SpeciesFinder, DEFAULT_MAX_DEPTH,
};
use crate::species::{LeavesProperties, Registry};
use crate::types::{offset, Direction, FamilyId, GridPos, LeavesId, SpeciesId};

/// A branch node of a severed piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BranchPiece {
    /// Position relative to the cut.
    pub offset: IVec3,
    pub radius: u8,
    pub family: FamilyId,
}

/// A leaves node of a severed piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LeafPiece {
    /// Position relative to the cut.
    pub offset: IVec3,
    pub leaves: LeavesId,
    pub hydration: u8,
}

/// Everything that came off the tree in one cut. Built once, read-only after.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BranchDestructionData {
    species: Option<SpeciesId>,
    cut_pos: GridPos,
    /// Direction from the cut toward the part of the tree that stays standing.
    cut_dir: Option<Direction>,
    tool_dir: Direction,
    branches: Vec<BranchPiece>,
    leaves: Vec<LeafPiece>,
    end_points: Vec<IVec3>,
    wood_volume: f32,
    trunk_height: u32,
    overflow: bool,
}

impl BranchDestructionData {
    fn empty(cut_pos: GridPos, tool_dir: Direction) -> Self {
        Self {
            species: None,
            cut_pos,
            cut_dir: None,
            tool_dir,
            branches: Vec::new(),
            leaves: Vec::new(),
            end_points: Vec::new(),
            wood_volume: 0.0,
            trunk_height: 0,
            overflow: false,
        }
    }

    pub fn species(&self) -> Option<SpeciesId> {
        self.species
    }

    pub fn cut_pos(&self) -> GridPos {
        self.cut_pos
    }

    pub fn cut_dir(&self) -> Option<Direction> {
        self.cut_dir
    }

    pub fn tool_dir(&self) -> Direction {
        self.tool_dir
    }

    /// Severed branches, closest to the cut first. The cut node is not listed.
    pub fn branches(&self) -> &[BranchPiece] {
        &self.branches
    }

    pub fn leaves(&self) -> &[LeafPiece] {
        &self.leaves
    }

    /// Twigs of the severed piece, relative to the cut.
    pub fn end_points(&self) -> &[IVec3] {
        &self.end_points
    }

    /// Wood volume of the piece including the cut node.
    pub fn wood_volume(&self) -> f32 {
        self.wood_volume
    }

    /// Height of the standing trunk above its root before the cut.
    pub fn trunk_height(&self) -> u32 {
        self.trunk_height
    }

    /// The network was larger than the walk could cover. The piece may be
    /// missing branches that are still in the grid.
    pub fn overflow(&self) -> bool {
        self.overflow
    }

    /// Nothing hung off the cut; removing the cut node is all there is to do.
    pub fn is_trivial(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Cuts the branch at `cut_pos` and removes everything that hangs off it.
///
/// The network is first searched for its root, which decides which side of
/// the cut stays standing. Everything on the other side is collected in
/// walk order, removed from the grid along with the leaves around its twigs,
/// and returned. The cut node itself is removed too. A `cut_pos` that holds
/// no branch gives a trivial snapshot and leaves the grid untouched. The
/// collecting walk is bounded by the species' `max_signal_depth`.
///
/// ### Parameters
/// - `grid` - World to cut in.
/// - `registry` - Used to resolve the family and leaves of the cut branch.
/// - `cut_pos` - Branch that was destroyed.
/// - `tool_dir` - Direction the cut came from, passed through to the snapshot.
///
/// ### Returns
/// - The severed piece.
pub fn compute_destruction_snapshot<G: Grid + ?Sized>(
    grid: &mut G,
    registry: &Registry,
    cut_pos: GridPos,
    tool_dir: Direction,
) -> BranchDestructionData {
    // The seen set bounds the root search, however far the root is.
    cut_with_root_search(grid, registry, cut_pos, tool_dir, u32::MAX)
}

fn cut_with_root_search<G: Grid + ?Sized>(
    grid: &mut G,
    registry: &Registry,
    cut_pos: GridPos,
    tool_dir: Direction,
    search_depth: u32,
) -> BranchDestructionData {
    let family = match read_occupant(&*grid, cut_pos) {
        Occupant::Branch { family, .. } => family,
        _ => return BranchDestructionData::empty(cut_pos, tool_dir),
    };
    let twig_radius = registry.family(family).map_or(1, |f| f.primary_thickness);

    let mut search = MapSignal::new(vec![Inspector::SpeciesFinder(SpeciesFinder::new())])
        .with_max_depth(search_depth);
    if search.traverse(grid, cut_pos, None) && search.found_root.is_none() {
        // Without a root there is no telling which side stands.
        tracing::warn!(?cut_pos, search_depth, "root search overflowed, nothing cut");
        return BranchDestructionData {
            overflow: true,
            ..BranchDestructionData::empty(cut_pos, tool_dir)
        };
    }
    let finder = search.inspectors.iter().find_map(|i| match i {
        Inspector::SpeciesFinder(f) => Some(*f),
        _ => None,
    });
    let species = finder.and_then(|f| f.species());
    let trunk_height = finder
        .and_then(|f| f.root())
        .map_or(0, |root| trunk_height(&*grid, root, family));
    let cut_dir = search.local_root_dir;

    let found = species.and_then(|id| registry.species(id));
    let leaves = found
        .map(|s| s.leaves())
        .filter(|l| l.family().id == family)
        .or_else(|| registry.leaves_for_family(family));
    let collect_depth = found.map_or(DEFAULT_MAX_DEPTH, |s| s.config().max_signal_depth);

    let mut collect = MapSignal::new(vec![
        Inspector::Collector(Collector::new(family, twig_radius)),
        Inspector::NetVolume(NetVolume::new()),
    ])
    .with_max_depth(collect_depth)
    .with_destroy_looped_nodes(true)
    .with_track_visited(true);
    let overflow = collect.traverse(grid, cut_pos, cut_dir);
    grid.clear_occupant(cut_pos);

    let mut data = BranchDestructionData {
        species,
        cut_dir,
        trunk_height,
        overflow,
        ..BranchDestructionData::empty(cut_pos, tool_dir)
    };
    for inspector in &collect.inspectors {
        match inspector {
            Inspector::Collector(collector) => {
                let mut branches = collector.branches().to_vec();
                branches.sort_by_key(|b| b.depth);
                data.branches = branches
                    .into_iter()
                    .map(|b| BranchPiece {
                        offset: b.pos - cut_pos,
                        radius: b.radius,
                        family,
                    })
                    .collect();
                data.end_points = collector.end_points().iter().map(|p| *p - cut_pos).collect();
                if let Some(leaves) = leaves {
                    data.leaves = take_leaves(grid, leaves, collector.end_points())
                        .into_iter()
                        .map(|(pos, hydration)| LeafPiece {
                            offset: pos - cut_pos,
                            leaves: leaves.id(),
                            hydration,
                        })
                        .collect();
                }
            }
            Inspector::NetVolume(volume) => data.wood_volume = volume.volume(),
            _ => {}
        }
    }

    tracing::debug!(
        ?cut_pos,
        ?species,
        branches = data.branches.len(),
        leaves = data.leaves.len(),
        overflow,
        "computed destruction snapshot"
    );
    data
}

/// Result of [`destroy_network`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestroyedNetwork {
    pub destroyed: usize,
    pub leaves_removed: usize,
    pub end_points: Vec<GridPos>,
    pub overflow: bool,
}

/// Removes the whole network of `leaves`' family connected to `pos`, with
/// the leaves around its twigs. Roots stay.
pub fn destroy_network<G: Grid + ?Sized>(
    grid: &mut G,
    leaves: &LeavesProperties,
    pos: GridPos,
) -> DestroyedNetwork {
    let family = leaves.family();
    let mut signal = MapSignal::new(vec![Inspector::Destroyer(Destroyer::new(
        family.id,
        family.primary_thickness,
    ))])
    .with_destroy_looped_nodes(true);
    let overflow = signal.traverse(grid, pos, None);

    let (destroyed, end_points) = match signal.inspectors.pop() {
        Some(Inspector::Destroyer(d)) => (d.destroyed(), d.end_points().to_vec()),
        _ => (0, Vec::new()),
    };
    let leaves_removed = take_leaves(grid, leaves, &end_points).len();
    DestroyedNetwork {
        destroyed,
        leaves_removed,
        end_points,
        overflow,
    }
}

/// Clears the leaves of this type inside the leaf cluster around each end
/// point and returns where they were. Each cell is taken at most once.
fn take_leaves<G: Grid + ?Sized>(
    grid: &mut G,
    leaves: &LeavesProperties,
    end_points: &[GridPos],
) -> Vec<(GridPos, u8)> {
    let cluster = leaves.cell_kit().leaf_cluster();
    let mut taken = Vec::new();
    for &end in end_points {
        for (rel, _) in cluster.non_zero() {
            let pos = end + rel;
            if let Occupant::Leaves {
                leaves: id,
                hydration,
            } = read_occupant(&*grid, pos)
            {
                if id == leaves.id() {
                    grid.clear_occupant(pos);
                    taken.push((pos, hydration));
                }
            }
        }
    }
    taken
}

/// Contiguous branches of `family` straight up from the root.
fn trunk_height<G: Grid + ?Sized>(grid: &G, root: GridPos, family: FamilyId) -> u32 {
    let mut height = 0;
    let mut pos = offset(root, Direction::Up);
    while read_occupant(&*grid, pos).is_branch_of(family) {
        height += 1;
        pos = offset(pos, Direction::Up);
    }
    height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::grow_one_pulse;
    use crate::grid::VoxelGrid;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn setup() -> (Registry, VoxelGrid, GridPos) {
        let registry = Registry::with_builtin_species().unwrap();
        let oak = registry.species_by_name("oak").unwrap();
        let mut grid = VoxelGrid::new();
        grid.fill_ground(0, 8);
        let root = IVec3::ZERO;
        grid.set_occupant(root, Occupant::Root { species: oak.id() });
        grid.set_occupant(
            root + IVec3::Y,
            Occupant::Branch {
                family: oak.family().id,
                radius: 1,
            },
        );
        (registry, grid, root)
    }

    fn grown(seed: u64, pulses: usize) -> (Registry, VoxelGrid, GridPos) {
        let (registry, mut grid, root) = setup();
        let oak = registry.species_by_name("oak").unwrap().clone();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        for _ in 0..pulses {
            grow_one_pulse(&mut grid, root, &oak, &mut rng, 16.0);
        }
        (registry, grid, root)
    }

    #[test]
    fn empty_cut_is_trivial_and_harmless() {
        let (registry, mut grid, _) = setup();
        let before = grid.sorted_cells();
        let data = compute_destruction_snapshot(&mut grid, &registry, IVec3::new(3, 4, 3), Direction::East);

        assert!(data.is_trivial());
        assert_eq!(data.species(), None);
        assert_eq!(grid.sorted_cells(), before);
    }

    #[test]
    fn isolated_branch_is_trivial() {
        let (registry, mut grid, _) = setup();
        let family = registry.family_by_name("oak").unwrap().id;
        let lone = IVec3::new(5, 6, 5);
        grid.set_occupant(lone, Occupant::Branch { family, radius: 3 });

        let data = compute_destruction_snapshot(&mut grid, &registry, lone, Direction::North);
        assert!(data.is_trivial());
        assert_eq!(data.cut_dir(), None);
        assert_eq!(grid.occupant_at(lone), Occupant::Air);
        assert_eq!(data.wood_volume(), 9.0 / 64.0);
    }

    #[test]
    fn cut_trunk_takes_the_whole_crown() {
        let (registry, mut grid, root) = grown(17, 40);
        let oak = registry.species_by_name("oak").unwrap();
        let family = oak.family().id;
        let cut = root + IVec3::new(0, 2, 0);
        let above: Vec<_> = grid
            .sorted_cells()
            .into_iter()
            .filter(|(p, o)| o.is_branch_of(family) && p.y > cut.y)
            .map(|(p, _)| p)
            .collect();
        let trunk_before = trunk_height(&grid, root, family);

        let data = compute_destruction_snapshot(&mut grid, &registry, cut, Direction::West);

        assert_eq!(data.species(), Some(oak.id()));
        assert_eq!(data.cut_dir(), Some(Direction::Down));
        assert_eq!(data.tool_dir(), Direction::West);
        assert_eq!(data.trunk_height(), trunk_before);
        assert!(!data.overflow());

        // Exactly once each, and nothing of the family left above the cut.
        let mut offsets: Vec<_> = data.branches().iter().map(|b| cut + b.offset).collect();
        offsets.sort_by_key(|p| (p.y, p.x, p.z));
        offsets.dedup();
        assert_eq!(offsets.len(), data.branches().len());
        for p in &above {
            assert!(offsets.contains(p), "{p} was not collected");
        }
        assert_eq!(grid.count_branches(family), 1);
        assert!(grid.occupant_at(root + IVec3::Y).is_branch_of(family));
        assert!(grid.occupant_at(cut).is_air());

        // Closest first.
        let first = data.branches().first().unwrap();
        assert_eq!(first.offset, IVec3::Y);
    }

    fn tall_trunk(registry: &Registry, height: i32) -> (VoxelGrid, FamilyId) {
        let oak = registry.species_by_name("oak").unwrap();
        let family = oak.family().id;
        let mut grid = VoxelGrid::new();
        grid.set_occupant(IVec3::ZERO, Occupant::Root { species: oak.id() });
        for y in 1..=height {
            grid.set_occupant(IVec3::new(0, y, 0), Occupant::Branch { family, radius: 2 });
        }
        (grid, family)
    }

    #[test]
    fn cut_far_above_the_root_keeps_the_standing_trunk() {
        let registry = Registry::with_builtin_species().unwrap();
        let (mut grid, family) = tall_trunk(&registry, 40);
        let cut = IVec3::new(0, 36, 0);

        let data = compute_destruction_snapshot(&mut grid, &registry, cut, Direction::East);

        assert_eq!(data.cut_dir(), Some(Direction::Down));
        assert!(!data.overflow());
        assert_eq!(data.trunk_height(), 40);
        assert_eq!(data.branches().len(), 4);
        assert!(data.branches().iter().all(|b| b.offset.y > 0));
        let standing = (1..36)
            .filter(|&y| grid.occupant_at(IVec3::new(0, y, 0)).is_branch_of(family))
            .count();
        assert_eq!(standing, 35);
        assert_eq!(grid.count_branches(family), 35);
    }

    #[test]
    fn rootless_search_overflow_leaves_the_grid_alone() {
        let registry = Registry::with_builtin_species().unwrap();
        let (mut grid, _) = tall_trunk(&registry, 40);
        let before = grid.sorted_cells();

        let data = cut_with_root_search(&mut grid, &registry, IVec3::new(0, 36, 0), Direction::East, 8);

        assert!(data.overflow());
        assert!(data.is_trivial());
        assert_eq!(data.cut_dir(), None);
        assert_eq!(grid.sorted_cells(), before);
    }

    #[test]
    fn snapshot_is_deterministic() {
        let snapshot = || {
            let (registry, mut grid, root) = grown(3, 30);
            let data = compute_destruction_snapshot(&mut grid, &registry, root + IVec3::new(0, 3, 0), Direction::South);
            (data, grid.sorted_cells())
        };
        assert_eq!(snapshot(), snapshot());
    }

    #[test]
    fn leaves_around_twigs_come_off_with_the_branch() {
        let (registry, mut grid, root) = setup();
        let oak = registry.species_by_name("oak").unwrap();
        let family = oak.family().id;
        let leaves = oak.leaves().id();
        let twig = root + IVec3::new(0, 3, 0);
        grid.set_occupant(root + IVec3::new(0, 2, 0), Occupant::Branch { family, radius: 2 });
        grid.set_occupant(twig, Occupant::Branch { family, radius: 1 });
        let leaf = twig + IVec3::Y;
        grid.set_occupant(leaf, Occupant::Leaves { leaves, hydration: 4 });

        let data = compute_destruction_snapshot(&mut grid, &registry, root + IVec3::new(0, 2, 0), Direction::East);

        assert_eq!(data.branches(), &[BranchPiece { offset: IVec3::Y, radius: 1, family }]);
        assert_eq!(data.end_points(), &[IVec3::Y]);
        assert_eq!(
            data.leaves(),
            &[LeafPiece {
                offset: IVec3::new(0, 2, 0),
                leaves,
                hydration: 4
            }]
        );
        assert!(grid.occupant_at(leaf).is_air());
        assert_eq!(data.trunk_height(), 3);
    }

    #[test]
    fn destroy_network_removes_branches_but_keeps_the_root() {
        let (registry, mut grid, root) = grown(5, 25);
        let oak = registry.species_by_name("oak").unwrap();
        let family = oak.family().id;
        let branches = grid.count_branches(family);

        let removed = destroy_network(&mut grid, oak.leaves(), root + IVec3::Y);
        assert_eq!(removed.destroyed, branches);
        assert!(!removed.end_points.is_empty());
        assert_eq!(grid.count_branches(family), 0);
        assert!(matches!(grid.occupant_at(root), Occupant::Root { .. }));
    }
}
