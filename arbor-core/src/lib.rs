//! Voxel tree growth, hydration and destruction library.
//!
//! Main components:
//! - [`types`] - grid positions, directions and typed ids.
//! - [`grid`] - the grid capability the engines work through, and an in-memory grid.
//! - [`config`] - already-parsed family, leaves and species definitions.
//! - [`error`] - configuration errors raised at registration time.
//! - [`species`] - the registry that resolves definitions into species.
//! - [`cells`] - hydration cells, solvers and per-leaves cell kits.
//! - [`leaves`] - leaf placement, light and aging.
//! - [`growth`] - growth pulses and per-species growth logic.
//! - [`network`] - branch network walks and their inspectors.
//! - [`destruction`] - cutting branches and snapshotting what falls.
//! - [`phases`] - per-tick growth and aging passes.

pub mod cells;
pub mod config;
pub mod destruction;
pub mod error;
pub mod grid;
pub mod growth;
pub mod leaves;
pub mod network;
pub mod phases;
pub mod species;
pub mod types;
