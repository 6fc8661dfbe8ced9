//! Headless driver for the arbor simulation.
//!
//! Plants one tree on a flat patch of ground, grows it for a number of
//! pulses with leaf aging in between, and optionally cuts the trunk and
//! reports what fell. Set `RUST_LOG=arbor_core=debug` to follow each pulse.

use clap::Parser;
use glam::IVec3;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing_subscriber::EnvFilter;

use arbor_core::destruction::compute_destruction_snapshot;
use arbor_core::grid::{Grid, Occupant, VoxelGrid};
use arbor_core::phases::{growth_phase, leaf_aging_phase};
use arbor_core::species::Registry;
use arbor_core::types::Direction;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed for every random decision
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of growth pulses to send
    #[arg(long, default_value_t = 60)]
    pulses: u32,

    /// Energy per pulse. Defaults to the species' configured signal energy.
    #[arg(long)]
    energy: Option<f32>,

    /// Built-in species to plant: oak, spruce, dark_oak or willow
    #[arg(long, default_value = "oak")]
    species: String,

    /// Cut the trunk at this height above the root once grown
    #[arg(long)]
    cut_height: Option<i32>,

    /// Leaf aging passes after each pulse
    #[arg(long, default_value_t = 1)]
    aging_ticks: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();
    let registry = Registry::with_builtin_species()?;
    let species = registry
        .species_by_name(&args.species)
        .ok_or_else(|| format!("unknown species `{}`", args.species))?;

    let mut grid = VoxelGrid::with_bounds(IVec3::new(-32, -4, -32), IVec3::new(32, 96, 32));
    grid.fill_ground(0, 32);
    let root = IVec3::ZERO;
    grid.set_occupant(root, Occupant::Root { species: species.id() });
    grid.set_occupant(
        root + IVec3::Y,
        Occupant::Branch {
            family: species.family().id,
            radius: species.family().primary_thickness,
        },
    );

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(args.seed);
    let mut grown = 0;
    for _ in 0..args.pulses {
        let results = growth_phase(&mut grid, &registry, &[root], &mut rng, args.energy);
        grown += results.iter().filter(|(_, r)| r.success).count();
        for _ in 0..args.aging_ticks {
            let leaves = grid.leaves_positions();
            leaf_aging_phase(&mut grid, &registry, &leaves, &mut rng, false);
        }
    }

    let trunk = grid.occupant_at(root + IVec3::Y).branch_radius().unwrap_or(0);
    println!(
        "{}: {}/{} pulses grew, trunk radius {}, {} branches, {} leaves",
        species.name(),
        grown,
        args.pulses,
        trunk,
        grid.count_branches(species.family().id),
        grid.leaves_positions().len(),
    );

    if let Some(height) = args.cut_height {
        let cut = root + IVec3::new(0, height, 0);
        let data = compute_destruction_snapshot(&mut grid, &registry, cut, Direction::East);
        if data.is_trivial() {
            println!("cut at {cut}: nothing fell");
        } else {
            println!(
                "cut at {cut}: {} branches and {} leaves fell, wood volume {:.2}, trunk height {}{}",
                data.branches().len(),
                data.leaves().len(),
                data.wood_volume(),
                data.trunk_height(),
                if data.overflow() { " (partial)" } else { "" },
            );
        }
    }
    Ok(())
}
