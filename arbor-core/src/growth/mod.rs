//! Growth pulses.
//!
//! A pulse is a single [`GrowSignal`] that walks from a root up the trunk and
//! out along the branches, choosing one direction per node. It ends by
//! sprouting a twig into leaves or air, or by failing. On the way back every
//! node it passed through is thickened from the cross-section of everything
//! hanging off it.
//!
//! The signal is a plain value: each step takes it and hands back the updated
//! copy, so a failed attempt in one direction can be retried from the state
//! the node saw before it.

mod logic;

pub use logic::{
    DirectionContext, DirectionFn, EnergyContext, EnergyFn, GrowthLogicKit, HeightContext,
    HeightFn, ProbMap,
};

use glam::IVec3;
use rand::Rng;

use crate::config::SpeciesConfig;
use crate::grid::{read_occupant, Grid, Occupant};
use crate::leaves::{grow_leaves_if_suitable, need_leaves};
use crate::species::Species;
use crate::types::{offset, Direction, GridPos};

/// Why a pulse stopped short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowFailure {
    /// Ran out of energy.
    Exhausted,
    /// Took more steps than the species allows.
    DepthLimit,
    /// No direction left to go, or the chosen cell cannot be entered.
    Blocked,
    /// A new twig would touch another branch of the same family.
    Crowded,
    /// A new twig would have no leaves to feed.
    NoFoliage,
}

impl GrowFailure {
    /// Failures caused by the chosen cell alone. Another direction may work.
    fn is_local(self) -> bool {
        matches!(
            self,
            GrowFailure::Blocked | GrowFailure::Crowded | GrowFailure::NoFoliage
        )
    }
}

/// State of a pulse walking through the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrowSignal {
    pub root: GridPos,
    /// Position relative to `root`.
    pub delta: IVec3,
    pub dir: Direction,
    pub energy: f32,
    /// Radius reported back to the parent node.
    pub radius: f32,
    pub num_steps: u32,
    pub num_turns: u32,
    pub success: bool,
    pub failure: Option<GrowFailure>,
}

impl GrowSignal {
    pub fn new(root: GridPos, energy: f32) -> Self {
        Self {
            root,
            delta: IVec3::ZERO,
            dir: Direction::Up,
            energy,
            radius: 0.0,
            num_steps: 0,
            num_turns: 0,
            success: true,
            failure: None,
        }
    }

    /// Still climbing the trunk; it has never turned.
    #[inline]
    pub fn is_in_trunk(&self) -> bool {
        self.num_turns == 0
    }

    pub fn position(&self) -> GridPos {
        self.root + self.delta
    }

    /// Moves one cell along `dir` and pays for it.
    fn step(mut self, config: &SpeciesConfig) -> Self {
        self.num_steps += 1;
        self.delta += self.dir.offset();

        let mut cost = config.step_cost;
        if self.dir == Direction::Up {
            cost += config.climb_cost;
        }
        self.energy -= cost;

        if self.num_steps > config.max_signal_depth {
            self.fail(GrowFailure::DepthLimit)
        } else if self.energy <= 0.0 {
            self.fail(GrowFailure::Exhausted)
        } else {
            self
        }
    }

    fn turn(mut self, dir: Direction) -> Self {
        if dir != self.dir {
            self.num_turns += 1;
            self.dir = dir;
        }
        self
    }

    fn fail(mut self, failure: GrowFailure) -> Self {
        self.success = false;
        self.failure = Some(failure);
        self
    }
}

/// Outcome of one pulse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrowResult {
    pub success: bool,
    /// Trunk base radius after the pulse.
    pub new_radius: u8,
    pub failure: Option<GrowFailure>,
    pub steps: u32,
}

/// Sends one growth pulse from the root at `root`.
///
/// The trunk base is the cell directly above the root and must already be a
/// branch of the species' family. An `energy_budget` of zero or less fails
/// at once and leaves the grid untouched.
///
/// ### Parameters
/// - `grid` - World to grow in. Mutated in place.
/// - `root` - Position of the root node.
/// - `species` - Species whose family, leaves and growth logic are used.
/// - `rng` - Source of all random direction choices.
/// - `energy_budget` - Energy handed to the species' energy function.
///
/// ### Returns
/// - A [`GrowResult`] with the trunk base radius after the pulse.
pub fn grow_one_pulse<G, R>(
    grid: &mut G,
    root: GridPos,
    species: &Species,
    rng: &mut R,
    energy_budget: f32,
) -> GrowResult
where
    G: Grid + ?Sized,
    R: Rng,
{
    let family = species.family().id;
    let trunk = offset(root, Direction::Up);
    let trunk_radius = |grid: &G| match read_occupant(&*grid, trunk) {
        Occupant::Branch { family: f, radius } if f == family => radius,
        _ => 0,
    };

    let start_radius = trunk_radius(&*grid);
    if !(energy_budget > 0.0) {
        return GrowResult::failed(start_radius, GrowFailure::Exhausted);
    }
    if !matches!(read_occupant(&*grid, root), Occupant::Root { .. }) || start_radius == 0 {
        tracing::debug!(?root, "no root with a trunk above it");
        return GrowResult::failed(start_radius, GrowFailure::Blocked);
    }

    let logic = species.logic();
    let suitability = grid.suitability(root);
    let energy = (logic.energy)(&EnergyContext {
        pos: root,
        signal_energy: energy_budget,
        suitability,
    });
    let lowest_branch_height = (logic.lowest_branch_height)(&HeightContext {
        pos: root,
        lowest_branch_height: species.config().lowest_branch_height,
        suitability,
    });

    let mut pulse = Pulse {
        grid: &mut *grid,
        species,
        rng,
        species_energy: energy,
        lowest_branch_height,
    };
    let signal = pulse.grow_branch(trunk, GrowSignal::new(root, energy));

    let new_radius = trunk_radius(&*grid);
    tracing::debug!(
        ?root,
        species = species.name(),
        success = signal.success,
        failure = ?signal.failure,
        steps = signal.num_steps,
        new_radius,
        "growth pulse"
    );
    GrowResult {
        success: signal.success,
        new_radius,
        failure: signal.failure,
        steps: signal.num_steps,
    }
}

impl GrowResult {
    fn failed(radius: u8, failure: GrowFailure) -> Self {
        Self {
            success: false,
            new_radius: radius,
            failure: Some(failure),
            steps: 0,
        }
    }
}

struct Pulse<'a, G: ?Sized, R> {
    grid: &'a mut G,
    species: &'a Species,
    rng: &'a mut R,
    species_energy: f32,
    lowest_branch_height: u32,
}

impl<G, R> Pulse<'_, G, R>
where
    G: Grid + ?Sized,
    R: Rng,
{
    /// Passes the signal through the branch at `pos`, then thickens it.
    fn grow_branch(&mut self, pos: GridPos, signal: GrowSignal) -> GrowSignal {
        let species = self.species;
        let config = species.config();
        let family = species.family();

        let signal = signal.step(config);
        if !signal.success {
            return signal;
        }
        let current = match read_occupant(&*self.grid, pos) {
            Occupant::Branch { family: f, radius } if f == family.id => radius,
            _ => return signal.fail(GrowFailure::Blocked),
        };
        let origin = signal.dir.opposite();

        let mut excluded = [false; 6];
        excluded[origin.index()] = true;
        let (mut signal, target) = loop {
            let Some((dir, selected)) = self.select_new_direction(pos, signal, current, &excluded)
            else {
                break (signal.fail(GrowFailure::Blocked), None);
            };
            let turned = selected.turn(dir);
            let next = offset(pos, dir);

            let (result, retryable) = match read_occupant(&*self.grid, next) {
                Occupant::Branch { family: f, .. } if f == family.id => {
                    (self.grow_branch(next, turned), false)
                }
                Occupant::Leaves { .. } => (self.grow_leaves(next, turned), true),
                Occupant::Air if self.grid.is_accessible(next) => {
                    (self.grow_into_air(next, turned, current), true)
                }
                _ => (turned.fail(GrowFailure::Blocked), true),
            };

            if retryable && result.failure.is_some_and(GrowFailure::is_local) {
                tracing::trace!(?pos, ?dir, failure = ?result.failure, "direction rejected, retrying");
                excluded[dir.index()] = true;
                continue;
            }
            break (result, Some(dir));
        };

        // The new radius carries the area of the grown child plus every other
        // same-family branch hanging off this node.
        let mut area = signal.radius * signal.radius;
        for dir in Direction::ALL {
            if dir == origin || Some(dir) == target {
                continue;
            }
            if let Occupant::Branch { family: f, radius } = read_occupant(&*self.grid, offset(pos, dir)) {
                if f == family.id {
                    area += f32::from(radius) * f32::from(radius);
                }
            }
        }
        let radius = (area.sqrt() + config.tapering)
            .min(f32::from(family.max_branch_radius))
            .max(f32::from(current));
        let new_radius = radius as u8;
        if new_radius > current {
            self.grid.set_occupant(
                pos,
                Occupant::Branch {
                    family: family.id,
                    radius: new_radius,
                },
            );
        }
        signal.radius = radius;
        signal
    }

    fn grow_leaves(&mut self, pos: GridPos, signal: GrowSignal) -> GrowSignal {
        let signal = signal.step(self.species.config());
        if !signal.success {
            return signal;
        }
        self.branch_out(pos, signal)
    }

    /// A twig reaching into air grows leaves there first, then tries to
    /// branch out into them. Thicker branches branch out directly.
    fn grow_into_air(&mut self, pos: GridPos, signal: GrowSignal, from_radius: u8) -> GrowSignal {
        let leaves = self.species.leaves();
        if from_radius == leaves.family().primary_thickness
            && !grow_leaves_if_suitable(self.grid, leaves, pos, 0)
        {
            return signal.fail(GrowFailure::NoFoliage);
        }
        self.branch_out(pos, signal)
    }

    /// Turns `pos` into a twig if it has foliage, touches no other branch of
    /// the family except where the signal came from, and has leaves to feed.
    fn branch_out(&mut self, pos: GridPos, mut signal: GrowSignal) -> GrowSignal {
        let grid = &mut *self.grid;
        let leaves = self.species.leaves();
        let family = leaves.family();

        if !need_leaves(grid, leaves, pos) {
            return signal.fail(GrowFailure::NoFoliage);
        }

        let origin = signal.dir.opposite();
        let crowded = Direction::ALL
            .into_iter()
            .filter(|dir| *dir != origin)
            .any(|dir| read_occupant(&*grid, offset(pos, dir)).is_branch_of(family.id));
        if crowded {
            return signal.fail(GrowFailure::Crowded);
        }

        let fed = Direction::ALL
            .into_iter()
            .any(|dir| need_leaves(grid, leaves, offset(pos, dir)));
        if !fed {
            return signal.fail(GrowFailure::NoFoliage);
        }

        grid.set_occupant(
            pos,
            Occupant::Branch {
                family: family.id,
                radius: family.primary_thickness,
            },
        );
        tracing::trace!(?pos, steps = signal.num_steps, "branched out");
        signal.radius = f32::from(family.secondary_thickness);
        signal
    }

    /// Picks where the signal goes from `pos`, never back where it came from
    /// and never into an `excluded` direction.
    ///
    /// Returns the direction with the signal as it should leave the node,
    /// which may have lost energy to a trunk exit or an energy cap.
    fn select_new_direction(
        &mut self,
        pos: GridPos,
        signal: GrowSignal,
        branch_radius: u8,
        excluded: &[bool; 6],
    ) -> Option<(Direction, GrowSignal)> {
        let species = self.species;
        let config = species.config();

        // Below the lowest branch the trunk only climbs.
        if signal.num_steps + 1 <= self.lowest_branch_height {
            return (!excluded[Direction::Up.index()]).then_some((Direction::Up, signal));
        }

        let mut probs = ProbMap::default();
        if signal.dir != Direction::Down {
            probs.set(Direction::Up, config.up_probability);
        }
        probs.add(signal.dir, config.reinf_travel);
        for dir in Direction::ALL {
            if !excluded[dir.index()] {
                probs.add(dir, self.neighbor_weight(offset(pos, dir)));
            }
        }

        let ctx = DirectionContext {
            pos,
            signal: &signal,
            config,
            species_energy: self.species_energy,
            lowest_branch_height: self.lowest_branch_height,
            branch_radius,
        };
        let mut probs = (species.logic().direction_manipulation)(probs, &ctx);
        for dir in Direction::ALL {
            if excluded[dir.index()] {
                probs.set(dir, 0.0);
            }
        }

        let dir = probs.select(&mut *self.rng)?;
        let mut signal = signal;
        if signal.is_in_trunk() && dir != Direction::Up {
            signal.energy /= config.trunk_exit_divisor.max(1.0);
        }
        if let Some(cap) = probs.energy_cap {
            signal.energy = signal.energy.min(cap);
        }
        Some((dir, signal))
    }

    /// Air invites growth, matching leaves more so, and thick branches of the
    /// same family the most.
    fn neighbor_weight(&self, pos: GridPos) -> f32 {
        match read_occupant(&*self.grid, pos) {
            Occupant::Air if self.grid.is_accessible(pos) => 1.0,
            Occupant::Leaves { leaves, .. } if leaves == self.species.leaves().id() => 2.0,
            Occupant::Branch { family, radius } if family == self.species.family().id => {
                f32::from(radius) + 2.0
            }
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VoxelGrid;
    use crate::species::Registry;
    use crate::types::FamilyId;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn seedling(registry: &Registry, species: &str) -> (VoxelGrid, GridPos) {
        let species = registry.species_by_name(species).unwrap();
        let mut grid = VoxelGrid::new();
        grid.fill_ground(0, 8);
        let root = IVec3::ZERO;
        grid.set_occupant(root, Occupant::Root { species: species.id() });
        grid.set_occupant(
            root + IVec3::Y,
            Occupant::Branch {
                family: species.family().id,
                radius: 1,
            },
        );
        (grid, root)
    }

    fn branches(grid: &VoxelGrid, family: FamilyId) -> Vec<(GridPos, u8)> {
        grid.sorted_cells()
            .into_iter()
            .filter_map(|(p, o)| match o {
                Occupant::Branch { family: f, radius } if f == family => Some((p, radius)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_budget_fails_without_touching_the_grid() {
        let registry = Registry::with_builtin_species().unwrap();
        let oak = registry.species_by_name("oak").unwrap();
        let (mut grid, root) = seedling(&registry, "oak");
        let before = grid.sorted_cells();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let result = grow_one_pulse(&mut grid, root, oak, &mut rng, 0.0);

        assert!(!result.success);
        assert_eq!(result.failure, Some(GrowFailure::Exhausted));
        assert_eq!(result.new_radius, 1);
        assert_eq!(grid.sorted_cells(), before);
    }

    #[test]
    fn first_pulse_sprouts_a_twig_above_the_trunk() {
        let registry = Registry::with_builtin_species().unwrap();
        let oak = registry.species_by_name("oak").unwrap();
        let (mut grid, root) = seedling(&registry, "oak");

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let result = grow_one_pulse(&mut grid, root, oak, &mut rng, 16.0);

        assert!(result.success);
        assert_eq!(result.new_radius, 2);
        assert_eq!(
            grid.occupant_at(IVec3::new(0, 2, 0)),
            Occupant::Branch {
                family: oak.family().id,
                radius: 1
            }
        );
        assert!(grid.occupant_at(IVec3::new(0, 3, 0)).is_leaves_of(oak.leaves().id()));
    }

    #[test]
    fn pulse_without_a_root_is_blocked() {
        let registry = Registry::with_builtin_species().unwrap();
        let oak = registry.species_by_name("oak").unwrap();
        let mut grid = VoxelGrid::new();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

        let result = grow_one_pulse(&mut grid, IVec3::ZERO, oak, &mut rng, 16.0);
        assert_eq!(result.failure, Some(GrowFailure::Blocked));
        assert!(grid.is_empty());
    }

    #[test]
    fn crowded_twig_is_not_placed() {
        let registry = Registry::with_builtin_species().unwrap();
        let oak = registry.species_by_name("oak").unwrap();
        let family = oak.family().id;
        let (mut grid, root) = seedling(&registry, "oak");
        // A branch of the same family right beside the only cell the trunk
        // may grow into.
        grid.set_occupant(IVec3::new(1, 2, 0), Occupant::Branch { family, radius: 1 });

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let result = grow_one_pulse(&mut grid, root, oak, &mut rng, 16.0);

        assert!(!result.success);
        assert_eq!(result.failure, Some(GrowFailure::Blocked));
        assert!(!grid.occupant_at(IVec3::new(0, 2, 0)).is_branch_of(family));
        assert_eq!(result.new_radius, 1);
    }

    #[test]
    fn same_seed_grows_the_same_tree() {
        let registry = Registry::with_builtin_species().unwrap();
        for name in ["oak", "spruce", "dark_oak", "willow"] {
            let species = registry.species_by_name(name).unwrap();
            let grow = |seed| {
                let (mut grid, root) = seedling(&registry, name);
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
                for _ in 0..40 {
                    grow_one_pulse(&mut grid, root, species, &mut rng, 16.0);
                }
                grid.sorted_cells()
            };
            assert_eq!(grow(9), grow(9), "{name} diverged");
        }
    }

    #[test]
    fn trunk_of_a_grown_tree_is_taller_than_lowest_branch() {
        let registry = Registry::with_builtin_species().unwrap();
        let oak = registry.species_by_name("oak").unwrap();
        let (mut grid, root) = seedling(&registry, "oak");
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(21);
        for _ in 0..30 {
            grow_one_pulse(&mut grid, root, oak, &mut rng, 16.0);
        }

        let lowest = oak.config().lowest_branch_height as i32;
        for y in 1..=lowest {
            assert!(grid.occupant_at(IVec3::new(0, y, 0)).is_branch_of(oak.family().id));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_branch_radii_never_shrink(seed in any::<u64>(), pulses in 1usize..40) {
            let registry = Registry::with_builtin_species().unwrap();
            let oak = registry.species_by_name("oak").unwrap();
            let family = oak.family().id;
            let (mut grid, root) = seedling(&registry, "oak");
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

            for _ in 0..pulses {
                let before = branches(&grid, family);
                let result = grow_one_pulse(&mut grid, root, oak, &mut rng, 16.0);
                for (pos, radius) in before {
                    let now = grid.occupant_at(pos).branch_radius();
                    prop_assert!(now.is_some_and(|r| r >= radius));
                    prop_assert!(now.is_some_and(|r| r <= oak.family().max_branch_radius));
                }
                prop_assert!(result.new_radius >= 1);
            }
        }

        #[test]
        fn prop_new_twigs_touch_only_their_parent(seed in any::<u64>(), pulses in 1usize..40) {
            let registry = Registry::with_builtin_species().unwrap();
            let oak = registry.species_by_name("oak").unwrap();
            let family = oak.family().id;
            let (mut grid, root) = seedling(&registry, "oak");
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

            for _ in 0..pulses {
                let before = branches(&grid, family);
                grow_one_pulse(&mut grid, root, oak, &mut rng, 16.0);
                let added: Vec<_> = branches(&grid, family)
                    .into_iter()
                    .filter(|(p, _)| !before.iter().any(|(q, _)| q == p))
                    .collect();

                prop_assert!(added.len() <= 1);
                for (pos, radius) in added {
                    prop_assert_eq!(radius, oak.family().primary_thickness);
                    let neighbors = Direction::ALL
                        .into_iter()
                        .filter(|d| grid.occupant_at(offset(pos, *d)).is_branch_of(family))
                        .count();
                    prop_assert_eq!(neighbors, 1);
                }
            }
        }
    }
}
