//! Debris: pooled rigid-body pieces with fluid coupling.
//!
//! Pieces are born in the fracture engine and owned here. The pool enforces
//! hard entity and triangle budgets (oldest evicted first), the integrator
//! runs a fixed-substep semi-implicit Euler with AABB collision and sleeping,
//! and the fluid pass couples pieces to an externally supplied voxel grid.

pub mod fluid;
pub mod piece;
pub mod pool;
pub mod rigid;

pub use fluid::{
    FluidCell, FluidCellKind, FluidCoupling, FluidCouplingConfig, FluidGrid, UniformFluidGrid,
};
pub use piece::{DebrisPiece, VoxelApproximation, VOXEL_GRID_DIM};
pub use pool::{DebrisLod, DebrisPool, DebrisPoolConfig};
pub use rigid::{DebrisIntegrator, IntegratorConfig};
