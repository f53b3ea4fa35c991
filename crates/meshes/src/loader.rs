//! Mesh sources: how geometry gets from disk into [`MeshData`].

use crate::mesh::MeshData;
use crate::vertex::Vertex;
use crate::MeshError;
use std::path::Path;
use std::time::{Duration, Instant};

/// Contract for anything that can produce mesh data from a path. The cache
/// is the only caller; implementations must return positions, normals, UVs,
/// and 32-bit indices.
pub trait MeshSource {
    fn load(&self, path: &Path) -> Result<MeshData, MeshError>;
}

/// glTF-backed mesh source. Reads the first primitive of the first mesh in
/// the document; normals default to +Y and UVs to the origin when the
/// primitive omits them.
pub struct GltfMeshSource {
    /// Loads taking longer than this fail with `LoadTimeout`.
    timeout: Duration,
}

impl Default for GltfMeshSource {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl GltfMeshSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl MeshSource for GltfMeshSource {
    fn load(&self, path: &Path) -> Result<MeshData, MeshError> {
        if !path.exists() {
            return Err(MeshError::FileNotFound(path.to_path_buf()));
        }
        let started = Instant::now();

        let (document, buffers, _images) =
            gltf::import(path).map_err(|e| MeshError::LoadFailed(e.to_string()))?;

        let mesh = document
            .meshes()
            .next()
            .ok_or_else(|| MeshError::LoadFailed(format!("{}: no meshes", path.display())))?;
        let primitive = mesh
            .primitives()
            .next()
            .ok_or_else(|| MeshError::LoadFailed(format!("{}: no primitives", path.display())))?;

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| MeshError::LoadFailed(format!("{}: no positions", path.display())))?
            .collect();
        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(iter) => iter.collect(),
            None => vec![[0.0, 1.0, 0.0]; positions.len()],
        };
        let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
            Some(iter) => iter.into_f32().collect(),
            None => vec![[0.0, 0.0]; positions.len()],
        };
        let indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        if started.elapsed() > self.timeout {
            return Err(MeshError::LoadTimeout {
                path: path.to_path_buf(),
                seconds: self.timeout.as_secs(),
            });
        }

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                Vertex::new(
                    p,
                    normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                )
            })
            .collect();

        Ok(MeshData { vertices, indices })
    }
}
