//! Structural integrity and surface damage.
//!
//! Materials are SI-valued data records; per-vertex stress accumulates along
//! a load-bearing edge graph and decides whether an impact chips a surface,
//! cracks part of a body, or collapses it outright. Surface damage deforms
//! meshes in place under a budget and falls back to decals when exhausted.

pub mod material;
pub mod stress;
pub mod surface;

pub use material::{
    FractureBehavior, FractureProperties, MaterialCatalog, MaterialEntry, StructuralMaterial,
};
pub use stress::{
    FailureReport, LoadBearingEdge, StressState, StructuralApproach, StructuralBody,
    StructuralVertex,
};
pub use surface::{
    ChipRequest, DamageRecord, SurfaceDamage, SurfaceDamageKind, SurfaceDamageOutcome,
    SurfaceDecal,
};

/// Standard gravity [m/s²].
pub const GRAVITY: f32 = 9.81;
