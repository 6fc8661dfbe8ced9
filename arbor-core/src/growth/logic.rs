//! Per-species growth logic.
//!
//! A [`GrowthLogicKit`] is a table of three plain functions chosen when a
//! species is registered. The walk itself is shared; the kit only bends the
//! direction weights, the pulse energy and the trunk height, which is enough
//! to get conical, spreading or weeping silhouettes.

use glam::IVec3;
use rand::Rng;

use crate::config::SpeciesConfig;
use crate::types::{coord_hash, Direction, GridPos};

use super::GrowSignal;

/// Relative direction weights. They need not sum to anything.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProbMap {
    pub weights: [f32; 6],
    /// Upper bound the logic wants on the signal's remaining energy.
    pub energy_cap: Option<f32>,
}

impl ProbMap {
    #[inline]
    pub fn get(&self, dir: Direction) -> f32 {
        self.weights[dir.index()]
    }

    #[inline]
    pub fn set(&mut self, dir: Direction, weight: f32) {
        self.weights[dir.index()] = weight;
    }

    #[inline]
    pub fn add(&mut self, dir: Direction, weight: f32) {
        self.weights[dir.index()] += weight;
    }

    #[inline]
    pub fn scale(&mut self, dir: Direction, factor: f32) {
        self.weights[dir.index()] *= factor;
    }

    /// Draws a direction with probability proportional to its weight.
    /// Non-positive weights never win. `None` when nothing is positive.
    pub fn select(&self, rng: &mut impl Rng) -> Option<Direction> {
        let total: f32 = self.weights.iter().filter(|w| **w > 0.0).sum();
        if !(total > 0.0) {
            return None;
        }

        let mut pick = rng.random_range(0.0..total);
        let mut last = None;
        for dir in Direction::ALL {
            let weight = self.get(dir);
            if weight <= 0.0 {
                continue;
            }
            if pick < weight {
                return Some(dir);
            }
            pick -= weight;
            last = Some(dir);
        }
        last
    }
}

/// What the direction function may look at.
#[derive(Clone, Copy, Debug)]
pub struct DirectionContext<'a> {
    pub pos: GridPos,
    pub signal: &'a GrowSignal,
    pub config: &'a SpeciesConfig,
    /// Energy the pulse started with.
    pub species_energy: f32,
    pub lowest_branch_height: u32,
    /// Radius of the branch the signal is standing on.
    pub branch_radius: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct EnergyContext {
    pub pos: GridPos,
    pub signal_energy: f32,
    pub suitability: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct HeightContext {
    pub pos: GridPos,
    pub lowest_branch_height: u32,
    pub suitability: f32,
}

pub type DirectionFn = fn(ProbMap, &DirectionContext) -> ProbMap;
pub type EnergyFn = fn(&EnergyContext) -> f32;
pub type HeightFn = fn(&HeightContext) -> u32;

#[derive(Clone, Copy, Debug)]
pub struct GrowthLogicKit {
    pub name: &'static str,
    pub direction_manipulation: DirectionFn,
    pub energy: EnergyFn,
    pub lowest_branch_height: HeightFn,
}

impl GrowthLogicKit {
    pub fn by_name(name: &str) -> Option<GrowthLogicKit> {
        match name {
            "default" => Some(Self::DEFAULT),
            "conifer" => Some(Self::CONIFER),
            "dark_oak" => Some(Self::DARK_OAK),
            "weeping" => Some(Self::WEEPING),
            _ => None,
        }
    }

    pub const DEFAULT: GrowthLogicKit = GrowthLogicKit {
        name: "default",
        direction_manipulation: |probs, _| probs,
        energy: plain_energy,
        lowest_branch_height: plain_height,
    };

    /// Tall single leader with short alternating side branches.
    pub const CONIFER: GrowthLogicKit = GrowthLogicKit {
        name: "conifer",
        direction_manipulation: conifer_directions,
        energy: conifer_energy,
        lowest_branch_height: plain_height,
    };

    /// Short trunk, wide horizontal crown that spreads further with height.
    pub const DARK_OAK: GrowthLogicKit = GrowthLogicKit {
        name: "dark_oak",
        direction_manipulation: dark_oak_directions,
        energy: plain_energy,
        lowest_branch_height: scaled_height,
    };

    /// Side branches that arc over and hang down.
    pub const WEEPING: GrowthLogicKit = GrowthLogicKit {
        name: "weeping",
        direction_manipulation: weeping_directions,
        energy: plain_energy,
        lowest_branch_height: plain_height,
    };
}

fn plain_energy(ctx: &EnergyContext) -> f32 {
    ctx.signal_energy * ctx.suitability
}

fn plain_height(ctx: &HeightContext) -> u32 {
    ctx.lowest_branch_height
}

fn scaled_height(ctx: &HeightContext) -> u32 {
    (ctx.lowest_branch_height as f32 * ctx.suitability) as u32
}

/// Positional jitter of up to +20% so neighbouring conifers differ in height.
fn conifer_energy(ctx: &EnergyContext) -> f32 {
    let jitter = (coord_hash(ctx.pos) % 5) as f32 * 0.05;
    ctx.signal_energy * (1.0 + jitter) * ctx.suitability
}

fn conifer_directions(mut probs: ProbMap, ctx: &DirectionContext) -> ProbMap {
    let signal = ctx.signal;
    let in_trunk = signal.is_in_trunk();

    probs.set(Direction::Down, 0.0);
    probs.set(
        Direction::Up,
        if in_trunk { ctx.config.up_probability } else { 0.0 },
    );

    // Side branches leave the trunk only on odd steps, and never from a twig.
    let turns_allowed = !in_trunk || (signal.num_steps % 2 == 1 && ctx.branch_radius > 1);
    for dir in Direction::HORIZONTALS {
        probs.set(dir, if turns_allowed { 2.0 } else { 0.0 });
    }

    probs.set(signal.dir.opposite(), 0.0);
    let favour = if in_trunk {
        0.0
    } else if signal.num_turns == 1 {
        2.0
    } else {
        1.0
    };
    probs.add(signal.dir, favour);
    probs
}

fn dark_oak_directions(mut probs: ProbMap, ctx: &DirectionContext) -> ProbMap {
    let signal = ctx.signal;
    probs.set(Direction::Up, 4.0);

    if !signal.is_in_trunk() {
        probs.set(Direction::Up, 0.0);
        probs.set(Direction::Down, 0.0);
        probs.scale(signal.dir, 0.35);
    }

    let energy_ratio = if ctx.species_energy > 0.0 {
        signal.delta.y as f32 / ctx.species_energy
    } else {
        0.0
    };
    let spread_push = (energy_ratio * 2.0).max(1.0);
    for dir in Direction::HORIZONTALS {
        probs.scale(dir, spread_push);
    }

    // Just out of the trunk: keep going straight for one more cell so the
    // new limb clears the side branches of the same level.
    let horizontal = IVec3::new(signal.delta.x, 0, signal.delta.z);
    if signal.num_turns == 1 && horizontal.length_squared() == 1 {
        for dir in Direction::HORIZONTALS {
            if dir != signal.dir {
                probs.set(dir, 0.0);
            }
        }
    }

    if signal.is_in_trunk() {
        for dir in Direction::HORIZONTALS {
            if probs.get(dir) >= 7.0 {
                probs.set(dir, 2.0);
            }
        }
        if signal.delta.y > ctx.lowest_branch_height as i32 + 5 {
            probs.set(Direction::Up, 0.0);
            probs.energy_cap = Some(2.0);
        }
    }
    probs
}

fn weeping_directions(mut probs: ProbMap, ctx: &DirectionContext) -> ProbMap {
    let signal = ctx.signal;

    if signal.is_in_trunk() {
        probs.set(Direction::Down, 0.0);
        let crown = signal.delta.y - ctx.lowest_branch_height as i32;
        if crown > 2 {
            for dir in Direction::HORIZONTALS {
                probs.scale(dir, 1.5);
            }
        }
        return probs;
    }

    probs.set(Direction::Up, 0.0);
    if signal.num_turns >= 2 {
        probs.add(Direction::Down, ctx.config.up_probability * 1.5);
        for dir in Direction::HORIZONTALS {
            probs.scale(dir, 0.5);
        }
    } else {
        probs.set(Direction::Down, 0.0);
    }
    probs
}
