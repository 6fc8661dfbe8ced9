//! Simulation phases run once per tick by a driver.
//!
//! The typical update loop looks like:
//! 1. [`growth_phase`] sends one growth pulse from every root.
//! 2. [`leaf_aging_phase`] re-solves hydration and light for every leaf,
//!    removing the ones that starve and letting healthy ones spread.

use rand::Rng;

use crate::grid::{read_occupant, Grid, Occupant};
use crate::growth::{grow_one_pulse, GrowResult};
use crate::leaves::age_leaves;
use crate::species::Registry;
use crate::types::GridPos;

/// Sends one growth pulse from each root.
///
/// The species of each tree is read off its root node. Positions that no
/// longer hold a root, or hold one of an unregistered species, are skipped.
///
/// ### Parameters
/// - `grid` - The world; grown in place.
/// - `registry` - Resolves the species stored in each root.
/// - `roots` - Root positions, pulsed in this order.
/// - `rng` - Shared by every pulse, so the order of `roots` matters.
/// - `energy` - Overrides each species' configured signal energy when set.
///
/// ### Returns
/// The result of every pulse that was sent, paired with its root.
pub fn growth_phase<G, R>(
    grid: &mut G,
    registry: &Registry,
    roots: &[GridPos],
    rng: &mut R,
    energy: Option<f32>,
) -> Vec<(GridPos, GrowResult)>
where
    G: Grid + ?Sized,
    R: Rng,
{
    let mut results = Vec::with_capacity(roots.len());
    for &root in roots {
        let Occupant::Root { species } = read_occupant(&*grid, root) else {
            tracing::debug!(?root, "root is gone, skipping");
            continue;
        };
        let Some(species) = registry.species(species) else {
            tracing::warn!(?root, ?species, "root of an unregistered species");
            continue;
        };

        let budget = energy.unwrap_or(species.config().signal_energy);
        let result = grow_one_pulse(grid, root, species, rng, budget);
        results.push((root, result));
    }
    results
}

/// Counts from one [`leaf_aging_phase`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgingStats {
    pub aged: usize,
    pub died: usize,
}

/// Ages the leaves at each of `positions`.
///
/// Leaves grown by an earlier position in the same pass are not aged until
/// the next pass. Positions holding anything else by the time they come up
/// are skipped.
///
/// ### Parameters
/// - `grid` - The world; leaves are rewritten, removed or spread in place.
/// - `registry` - Resolves the leaves type stored in each cell.
/// - `positions` - Leaf positions, visited in this order. Callers should pass
///   a sorted list for reproducible runs.
/// - `rng` - Random source for the spread of poorly hydrated leaves.
/// - `world_gen` - Ignore light, as during world generation.
pub fn leaf_aging_phase<G, R>(
    grid: &mut G,
    registry: &Registry,
    positions: &[GridPos],
    rng: &mut R,
    world_gen: bool,
) -> AgingStats
where
    G: Grid + ?Sized,
    R: Rng,
{
    let mut stats = AgingStats::default();
    for &pos in positions {
        let Occupant::Leaves { leaves, .. } = read_occupant(&*grid, pos) else {
            continue;
        };
        let Some(leaves) = registry.leaves(leaves) else {
            continue;
        };

        stats.aged += 1;
        if age_leaves(grid, leaves, pos, rng, world_gen).is_none() {
            stats.died += 1;
        }
    }
    tracing::debug!(aged = stats.aged, died = stats.died, "leaf aging pass");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VoxelGrid;
    use glam::IVec3;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn forest(registry: &Registry) -> (VoxelGrid, Vec<GridPos>) {
        let mut grid = VoxelGrid::new();
        grid.fill_ground(0, 16);
        let mut roots = Vec::new();
        for (i, name) in ["oak", "spruce"].into_iter().enumerate() {
            let species = registry.species_by_name(name).unwrap();
            let root = IVec3::new(i as i32 * 12 - 6, 0, 0);
            grid.set_occupant(root, Occupant::Root { species: species.id() });
            grid.set_occupant(
                root + IVec3::Y,
                Occupant::Branch {
                    family: species.family().id,
                    radius: 1,
                },
            );
            roots.push(root);
        }
        (grid, roots)
    }

    #[test]
    fn growth_phase_pulses_each_root_once() {
        let registry = Registry::with_builtin_species().unwrap();
        let (mut grid, mut roots) = forest(&registry);
        roots.push(IVec3::new(40, 0, 40));

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let results = growth_phase(&mut grid, &registry, &roots, &mut rng, None);

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.success));
    }

    #[test]
    fn aging_a_grown_forest_is_reproducible() {
        let registry = Registry::with_builtin_species().unwrap();
        let run = || {
            let (mut grid, roots) = forest(&registry);
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
            let mut stats = Vec::new();
            for _ in 0..20 {
                growth_phase(&mut grid, &registry, &roots, &mut rng, None);
                let leaves = grid.leaves_positions();
                stats.push(leaf_aging_phase(&mut grid, &registry, &leaves, &mut rng, false));
            }
            (stats, grid.sorted_cells())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn stray_leaves_die_during_aging() {
        let registry = Registry::with_builtin_species().unwrap();
        let oak = registry.leaves_by_name("oak").unwrap();
        let mut grid = VoxelGrid::new();
        let stray = IVec3::new(0, 9, 0);
        grid.set_occupant(
            stray,
            Occupant::Leaves {
                leaves: oak.id(),
                hydration: 4,
            },
        );

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let stats = leaf_aging_phase(&mut grid, &registry, &[stray, IVec3::ZERO], &mut rng, false);
        assert_eq!(stats, AgingStats { aged: 1, died: 1 });
        assert!(grid.is_empty());
    }
}
