//! Walks over connected branch networks.
//!
//! A [`MapSignal`] spreads from a start node through adjacent branches of
//! one family, calling its [`Inspector`]s on the way in and on the way back
//! out. Roots end the walk where they are found. Destruction, volume and
//! species lookups are all inspectors over this one walk.

mod inspector;

pub use inspector::{
    CollectedBranch, Collector, Destroyer, Inspector, NetVolume, SpeciesFinder, Visit,
    VisitedTracker,
};

use std::collections::HashSet;

use crate::grid::{read_occupant, Grid, Occupant};
use crate::types::{offset, Direction, FamilyId, GridPos};

/// Default bound on walk depth.
pub const DEFAULT_MAX_DEPTH: u32 = 32;

/// Context and results of one network walk.
#[derive(Clone, Debug)]
pub struct MapSignal {
    pub max_depth: u32,
    /// Allow more than one root in the network. When off, any root past the
    /// first ends that path as a loop would.
    pub multiroot: bool,
    /// Clear nodes that close a cycle once the walk leaves them.
    pub destroy_looped_nodes: bool,
    /// Skip nodes any tracking inspector reports as already visited.
    pub track_visited: bool,
    pub inspectors: Vec<Inspector>,

    /// Set when the walk was cut short by `max_depth`.
    pub overflow: bool,
    pub found_root: Option<GridPos>,
    /// Direction from the start node toward the first root found.
    pub local_root_dir: Option<Direction>,
    pub looped: usize,
    pub rejected_roots: usize,

    family: Option<FamilyId>,
    seen: HashSet<GridPos>,
}

impl MapSignal {
    pub fn new(inspectors: Vec<Inspector>) -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            multiroot: false,
            destroy_looped_nodes: false,
            track_visited: false,
            inspectors,
            overflow: false,
            found_root: None,
            local_root_dir: None,
            looped: 0,
            rejected_roots: 0,
            family: None,
            seen: HashSet::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_multiroot(mut self, multiroot: bool) -> Self {
        self.multiroot = multiroot;
        self
    }

    pub fn with_destroy_looped_nodes(mut self, destroy: bool) -> Self {
        self.destroy_looped_nodes = destroy;
        self
    }

    pub fn with_track_visited(mut self, track: bool) -> Self {
        self.track_visited = track;
        self
    }

    /// Walks the network containing `pos`.
    ///
    /// ### Parameters
    /// - `grid` - World to walk. Inspectors may mutate it.
    /// - `pos` - Start node, a branch or a root. Anything else visits nothing.
    /// - `from_dir` - Direction the walk must not take from the start node.
    ///
    /// ### Returns
    /// - `true` if the walk hit `max_depth` and the results may be partial.
    pub fn traverse<G: Grid + ?Sized>(
        &mut self,
        grid: &mut G,
        pos: GridPos,
        from_dir: Option<Direction>,
    ) -> bool {
        match read_occupant(&*grid, pos) {
            Occupant::Branch { family, .. } => self.family = Some(family),
            Occupant::Root { .. } => {}
            _ => return self.overflow,
        }
        self.analyse(grid, pos, from_dir, 0);
        if self.overflow {
            tracing::debug!(?pos, max_depth = self.max_depth, "network walk overflowed");
        }
        self.overflow
    }

    fn analyse<G: Grid + ?Sized>(
        &mut self,
        grid: &mut G,
        pos: GridPos,
        from_dir: Option<Direction>,
        depth: u32,
    ) {
        if depth > self.max_depth {
            self.overflow = true;
            return;
        }
        self.seen.insert(pos);

        let occupant = read_occupant(&*grid, pos);
        let is_root = matches!(occupant, Occupant::Root { .. });
        if is_root && self.found_root.is_none() {
            self.found_root = Some(pos);
        }

        let visit = Visit {
            pos,
            occupant,
            from_dir,
            depth,
        };
        let mut proceed = true;
        for inspector in &mut self.inspectors {
            proceed &= inspector.run(grid, &visit);
        }

        let mut closes_loop = false;
        if proceed && (!is_root || depth == 0) {
            for dir in Direction::ALL {
                if Some(dir) == from_dir {
                    continue;
                }
                let next = offset(pos, dir);
                let next_is_root = match read_occupant(&*grid, next) {
                    Occupant::Branch { family, .. } => {
                        if *self.family.get_or_insert(family) != family {
                            continue;
                        }
                        false
                    }
                    Occupant::Root { .. } => true,
                    _ => continue,
                };

                if self.seen.contains(&next) {
                    if !next_is_root {
                        self.looped += 1;
                        closes_loop = true;
                    }
                    continue;
                }
                if next_is_root && self.found_root.is_some() && !self.multiroot {
                    self.rejected_roots += 1;
                    continue;
                }
                if self.track_visited
                    && self
                        .inspectors
                        .iter()
                        .filter(|i| i.is_tracking_visited())
                        .any(|i| i.was_visited(next))
                {
                    continue;
                }

                let had_root = self.found_root.is_some();
                self.analyse(grid, next, Some(dir.opposite()), depth + 1);
                if depth == 0 && !had_root && self.found_root.is_some() {
                    self.local_root_dir = Some(dir);
                }
            }
        }

        for inspector in &mut self.inspectors {
            inspector.return_run(grid, &visit);
        }
        if closes_loop && self.destroy_looped_nodes {
            tracing::trace!(?pos, "clearing looped node");
            grid.clear_occupant(pos);
        }
    }
}
