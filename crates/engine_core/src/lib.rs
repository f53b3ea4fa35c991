//! Core types shared by every simulation subsystem.
//!
//! This crate provides the foundational pieces used across the destruction
//! pipeline:
//! - Transform and spatial components
//! - Frame and fixed-step time management
//! - Common component types for ECS

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{IVec3, Quat, Vec3};
pub use hecs::{Entity, World};
