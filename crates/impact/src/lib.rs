//! Impact dispatch and frame orchestration.
//!
//! The dispatcher is the single place where energy thresholds live: an
//! incoming impact is classified into a fracture approach and turned into
//! concrete mutations of the tile world, surface damage, structural stress,
//! and the debris pool. The [`Simulation`] type owns every subsystem and
//! runs the fixed frame order, joining fracture futures before the pool
//! phase.

pub mod dispatcher;
pub mod simulation;

pub use dispatcher::{determine_approach, DispatcherConfig, FractureApproach, ImpactEvent};
pub use simulation::{BodyMesh, FrameStats, MaterialRef, Simulation, TileBody};
