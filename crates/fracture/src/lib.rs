//! Voronoi fracture engine.
//!
//! Given an impact point, direction, kinetic energy, and the material's
//! fracture properties, produces debris pieces with physically plausible
//! mass, inertia, and initial velocities. Seeds grow from the impact by
//! Poisson-disk sampling under impact-kind-specific size gradients; bounded
//! Voronoi cells are cut by bisector half-spaces; fragments take the convex
//! cell polyhedron clipped to the source bounds. Dispatch is asynchronous
//! with a complete CPU path; a failed or absent GPU backend falls back to it.

pub mod backend;
pub mod cells;
pub mod config;
pub mod engine;
pub mod gpu;
pub mod seeds;

pub use backend::{CpuBackend, FractureBackend, FractureFuture, FractureJob};
pub use cells::Polyhedron;
pub use config::{FractureConfig, ImpactKind};
pub use engine::FractureEngine;

use thiserror::Error;

/// Fracture dispatch failures. GPU failures are non-fatal; the engine falls
/// back to the CPU path for that call.
#[derive(Debug, Error)]
pub enum FractureError {
    #[error("no GPU compute backend available")]
    GpuUnavailable,
    #[error("GPU buffer allocation failed")]
    GpuAllocationFailed,
    #[error("source mesh has no volume")]
    DegenerateSource,
    #[error("backend failure: {0}")]
    Backend(String),
}
