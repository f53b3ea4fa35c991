//! Thermal and chemical simulation.
//!
//! Tracks per-entity temperature, phase, and combustion; transfers heat by
//! conduction, radiation, and convection; ignites fuel; and spreads fire on
//! a slower cadence. Runs at a fixed rate (default 30 Hz) decoupled from the
//! caller's frame via an accumulator.

pub mod grid;
pub mod simulator;
pub mod state;

pub use grid::SpatialGrid;
pub use simulator::{ThermalConfig, ThermalSimulator};
pub use state::{ChemicalComposition, Combustion, Phase, ThermalState};

/// Hard temperature bounds; values outside are clamped and logged once per
/// entity per session.
pub const MIN_TEMPERATURE_K: f32 = 1.0;
pub const MAX_TEMPERATURE_K: f32 = 10_000.0;

/// Contact area estimate used by pairwise conduction. A placeholder shared by
/// all pairs; refining it per contact patch is future work the config
/// documents.
pub const CONTACT_AREA_M2: f32 = 0.01;

/// Stefan–Boltzmann constant [W/(m²·K⁴)].
pub const STEFAN_BOLTZMANN: f32 = 5.670_4e-8;
