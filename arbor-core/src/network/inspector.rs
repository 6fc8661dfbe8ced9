use std::collections::HashSet;

use crate::grid::{Grid, Occupant};
use crate::types::{Direction, FamilyId, GridPos, SpeciesId};

/// What an inspector is told about the node being visited.
///
/// `occupant` is read before any inspector runs, so later inspectors still
/// see a node an earlier one removed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Visit {
    pub pos: GridPos,
    pub occupant: Occupant,
    /// Direction back toward the node the walk came from. `None` at the start.
    pub from_dir: Option<Direction>,
    pub depth: u32,
}

/// A visitor plugged into a [`super::MapSignal`] walk.
#[derive(Clone, Debug)]
pub enum Inspector {
    Destroyer(Destroyer),
    Collector(Collector),
    VisitedTracker(VisitedTracker),
    NetVolume(NetVolume),
    SpeciesFinder(SpeciesFinder),
}

impl Inspector {
    /// Called when the walk enters a node. `false` stops the walk from
    /// spreading past this node; other inspectors still run.
    pub fn run<G: Grid + ?Sized>(&mut self, grid: &mut G, visit: &Visit) -> bool {
        match self {
            Inspector::Destroyer(d) => d.run(visit),
            Inspector::Collector(c) => c.run(grid, visit),
            Inspector::VisitedTracker(t) => t.run(visit),
            Inspector::NetVolume(v) => v.run(visit),
            Inspector::SpeciesFinder(f) => f.run(visit),
        }
    }

    /// Called when the walk leaves a node, after all of its children.
    pub fn return_run<G: Grid + ?Sized>(&mut self, grid: &mut G, visit: &Visit) {
        if let Inspector::Destroyer(d) = self {
            d.return_run(grid, visit);
        }
    }

    /// Whether this inspector keeps a visited set [`super::MapSignal`] can
    /// skip nodes by.
    pub fn is_tracking_visited(&self) -> bool {
        matches!(self, Inspector::Collector(_) | Inspector::VisitedTracker(_))
    }

    pub fn was_visited(&self, pos: GridPos) -> bool {
        match self {
            Inspector::Collector(c) => c.visited.contains(&pos),
            Inspector::VisitedTracker(t) => t.seen.contains(&pos),
            _ => false,
        }
    }
}

/// Removes every branch of a family on the way back out, and remembers the
/// twigs it passed as end points.
#[derive(Clone, Debug)]
pub struct Destroyer {
    family: FamilyId,
    twig_radius: u8,
    end_points: Vec<GridPos>,
    destroyed: usize,
}

impl Destroyer {
    pub fn new(family: FamilyId, twig_radius: u8) -> Self {
        Self {
            family,
            twig_radius,
            end_points: Vec::new(),
            destroyed: 0,
        }
    }

    pub fn end_points(&self) -> &[GridPos] {
        &self.end_points
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    fn run(&mut self, visit: &Visit) -> bool {
        if let Occupant::Branch { family, radius } = visit.occupant {
            if family == self.family && radius == self.twig_radius {
                self.end_points.push(visit.pos);
            }
        }
        true
    }

    fn return_run<G: Grid + ?Sized>(&mut self, grid: &mut G, visit: &Visit) {
        if visit.occupant.is_branch_of(self.family) {
            grid.clear_occupant(visit.pos);
            self.destroyed += 1;
        }
    }
}

/// A branch picked up by a [`Collector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectedBranch {
    pub pos: GridPos,
    pub radius: u8,
    pub depth: u32,
}

/// Records and removes every branch of a family as soon as it is entered.
///
/// The start node is neither recorded as a branch nor removed, but it does
/// count as an end point when it is a twig.
#[derive(Clone, Debug)]
pub struct Collector {
    family: FamilyId,
    twig_radius: u8,
    branches: Vec<CollectedBranch>,
    end_points: Vec<GridPos>,
    visited: HashSet<GridPos>,
}

impl Collector {
    pub fn new(family: FamilyId, twig_radius: u8) -> Self {
        Self {
            family,
            twig_radius,
            branches: Vec::new(),
            end_points: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Branches in the order they were entered.
    pub fn branches(&self) -> &[CollectedBranch] {
        &self.branches
    }

    pub fn end_points(&self) -> &[GridPos] {
        &self.end_points
    }

    fn run<G: Grid + ?Sized>(&mut self, grid: &mut G, visit: &Visit) -> bool {
        self.visited.insert(visit.pos);
        let Occupant::Branch { family, radius } = visit.occupant else {
            return true;
        };
        if family != self.family {
            return true;
        }

        if radius == self.twig_radius {
            self.end_points.push(visit.pos);
        }
        if visit.depth > 0 {
            self.branches.push(CollectedBranch {
                pos: visit.pos,
                radius,
                depth: visit.depth,
            });
            grid.clear_occupant(visit.pos);
        }
        true
    }
}

/// Remembers every node the walk entered, in order.
#[derive(Clone, Debug, Default)]
pub struct VisitedTracker {
    order: Vec<GridPos>,
    seen: HashSet<GridPos>,
}

impl VisitedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> &[GridPos] {
        &self.order
    }

    fn run(&mut self, visit: &Visit) -> bool {
        if self.seen.insert(visit.pos) {
            self.order.push(visit.pos);
        }
        true
    }
}

/// Sums the wood volume of every branch entered, `radius² / 64` per node.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetVolume {
    volume: f32,
}

impl NetVolume {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn run(&mut self, visit: &Visit) -> bool {
        if let Some(radius) = visit.occupant.branch_radius() {
            let r = f32::from(radius);
            self.volume += r * r / 64.0;
        }
        true
    }
}

/// Reads the species off the first root the walk reaches, then stops the
/// walk from spreading any further. Started on a root, it reads that root
/// and visits nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpeciesFinder {
    species: Option<SpeciesId>,
    root: Option<GridPos>,
}

impl SpeciesFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn species(&self) -> Option<SpeciesId> {
        self.species
    }

    pub fn root(&self) -> Option<GridPos> {
        self.root
    }

    fn run(&mut self, visit: &Visit) -> bool {
        if self.root.is_some() {
            return false;
        }
        match visit.occupant {
            Occupant::Root { species } => {
                self.species = Some(species);
                self.root = Some(visit.pos);
                false
            }
            _ => true,
        }
    }
}
