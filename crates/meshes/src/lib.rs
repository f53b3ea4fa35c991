//! Mesh data, loading, and the shared tile mesh cache.
//!
//! CPU-side geometry lives in [`MeshData`]; disk formats come in through the
//! [`MeshSource`] contract (glTF by default); GPU residency is owned by
//! [`TileMeshCache`], the only component allowed to create or destroy device
//! buffers.

pub mod cache;
pub mod loader;
pub mod mesh;
pub mod vertex;

pub use cache::{GpuMeshHandle, MeshDevice, MeshId, NullDevice, TileMeshCache};
pub use loader::{GltfMeshSource, MeshSource};
pub use mesh::{Aabb, MeshData};
pub use vertex::Vertex;

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by mesh loading and the cache. All are non-fatal; callers
/// retry with a fallback mesh id.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("mesh load failed: {0}")]
    LoadFailed(String),
    #[error("GPU buffer allocation failed")]
    GpuAllocationFailed,
    #[error("mesh load timed out after {seconds}s: {path}")]
    LoadTimeout { path: PathBuf, seconds: u64 },
    #[error("unknown mesh id {0:?}")]
    UnknownId(MeshId),
}
