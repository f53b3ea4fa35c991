//! The debris piece: geometry plus rigid-body state.

use glam::{Quat, Vec3};
use meshes::{Aabb, MeshData};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Voxel approximation resolution per axis.
pub const VOXEL_GRID_DIM: usize = 4;

/// Smallest debris mass; anything lighter is floored.
pub const MIN_PIECE_MASS_KG: f32 = 0.1;

/// 4³ occupancy grid over the piece's local AABB, packed into one word.
/// Used by fluid sampling to estimate submerged volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelApproximation {
    bits: u64,
}

impl VoxelApproximation {
    pub fn solid() -> Self {
        Self { bits: u64::MAX }
    }

    fn index(x: usize, y: usize, z: usize) -> u32 {
        (x + VOXEL_GRID_DIM * (y + VOXEL_GRID_DIM * z)) as u32
    }

    pub fn occupied(&self, x: usize, y: usize, z: usize) -> bool {
        self.bits & (1u64 << Self::index(x, y, z)) != 0
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: bool) {
        let mask = 1u64 << Self::index(x, y, z);
        if value {
            self.bits |= mask;
        } else {
            self.bits &= !mask;
        }
    }

    pub fn occupied_count(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Build occupancy by testing voxel centers against the triangle planes
    /// of a convex mesh (outward normals). Falls back to fully solid when the
    /// mesh has no faces.
    pub fn from_convex_mesh(mesh: &MeshData, aabb: &Aabb) -> Self {
        if mesh.indices.len() < 3 {
            return Self::solid();
        }
        // Plane list (normal, point-on-plane) from triangles.
        let planes: Vec<(Vec3, Vec3)> = mesh
            .indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = Vec3::from(mesh.vertices[tri[0] as usize].position);
                let b = Vec3::from(mesh.vertices[tri[1] as usize].position);
                let c = Vec3::from(mesh.vertices[tri[2] as usize].position);
                let n = (b - a).cross(c - a);
                (n.length_squared() > 1e-12).then(|| (n.normalize(), a))
            })
            .collect();
        if planes.is_empty() {
            return Self::solid();
        }

        let size = aabb.size();
        let cell = size / VOXEL_GRID_DIM as f32;
        let margin = cell.length() * 0.5;
        let mut result = Self { bits: 0 };
        for z in 0..VOXEL_GRID_DIM {
            for y in 0..VOXEL_GRID_DIM {
                for x in 0..VOXEL_GRID_DIM {
                    let center = aabb.min
                        + Vec3::new(
                            (x as f32 + 0.5) * cell.x,
                            (y as f32 + 0.5) * cell.y,
                            (z as f32 + 0.5) * cell.z,
                        );
                    let inside = planes
                        .iter()
                        .all(|(n, p)| n.dot(center - *p) <= margin);
                    result.set(x, y, z, inside);
                }
            }
        }
        if result.bits == 0 {
            // Degenerate geometry; stay conservative.
            return Self::solid();
        }
        result
    }
}

/// A physics-simulated rigid fragment produced by fracture or chipping.
#[derive(Debug, Clone)]
pub struct DebrisPiece {
    /// Local-space geometry (positions, normals, UVs, 32-bit indices).
    pub geometry: MeshData,
    /// Local-space bounds of the geometry.
    pub local_aabb: Aabb,
    /// Local-space centroid.
    pub centroid: Vec3,
    pub mass_kg: f32,
    /// Diagonal inertia tensor (box approximation) [kg·m²].
    pub inertia: Vec3,

    // Rigid-body state.
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub is_sleeping: bool,
    /// Continuous time spent under both sleep thresholds.
    pub time_below_sleep_thresholds: f32,

    pub time_since_creation: f32,
    pub triangle_count: usize,
    /// Hash over quantized geometry; identical hashes render as instances.
    pub geometry_hash: u64,
    pub voxel_approximation: VoxelApproximation,
}

impl DebrisPiece {
    /// Derive a piece from fragment geometry and material density. Mass is
    /// AABB volume × density, floored; inertia uses the diagonal box formula.
    pub fn from_geometry(geometry: MeshData, density: f32, position: Vec3) -> Self {
        let local_aabb = geometry.aabb();
        let centroid = geometry.centroid();
        let mass_kg = (local_aabb.volume() * density).max(MIN_PIECE_MASS_KG);
        let size = local_aabb.size();
        let inertia = Vec3::new(
            mass_kg / 12.0 * (size.y * size.y + size.z * size.z),
            mass_kg / 12.0 * (size.x * size.x + size.z * size.z),
            mass_kg / 12.0 * (size.x * size.x + size.y * size.y),
        )
        .max(Vec3::splat(1e-4));
        let triangle_count = geometry.triangle_count();
        let geometry_hash = hash_geometry(&geometry);
        let voxel_approximation = VoxelApproximation::from_convex_mesh(&geometry, &local_aabb);

        Self {
            geometry,
            local_aabb,
            centroid,
            mass_kg,
            inertia,
            position,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            is_sleeping: false,
            time_below_sleep_thresholds: 0.0,
            time_since_creation: 0.0,
            triangle_count,
            geometry_hash,
            voxel_approximation,
        }
    }

    /// Convenience: a solid box piece (chips, test bodies).
    pub fn cuboid(size: Vec3, density: f32, position: Vec3) -> Self {
        Self::from_geometry(MeshData::cuboid(size), density, position)
    }

    /// World-space AABB from the rotated local bounds.
    pub fn world_aabb(&self) -> Aabb {
        let mut bb = Aabb::empty();
        let min = self.local_aabb.min;
        let max = self.local_aabb.max;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            );
            bb.grow(self.rotation * corner + self.position);
        }
        bb
    }

    /// World-space center of a voxel cell of the approximation grid.
    pub fn voxel_world_center(&self, x: usize, y: usize, z: usize) -> Vec3 {
        let cell = self.local_aabb.size() / VOXEL_GRID_DIM as f32;
        let local = self.local_aabb.min
            + Vec3::new(
                (x as f32 + 0.5) * cell.x,
                (y as f32 + 0.5) * cell.y,
                (z as f32 + 0.5) * cell.z,
            );
        self.rotation * local + self.position
    }

    pub fn wake(&mut self) {
        self.is_sleeping = false;
        self.time_below_sleep_thresholds = 0.0;
    }

    /// Apply an impulse at the center of mass; wakes the piece.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.wake();
        self.linear_velocity += impulse / self.mass_kg;
    }
}

/// Hash of quantized geometry: counts plus millimeter-quantized bounds.
/// Pieces cut from identical tiles collapse to the same instance group.
fn hash_geometry(mesh: &MeshData) -> u64 {
    let mut hasher = DefaultHasher::new();
    mesh.vertices.len().hash(&mut hasher);
    mesh.indices.len().hash(&mut hasher);
    let bb = mesh.aabb();
    for v in [bb.min, bb.max] {
        [
            (v.x * 1000.0).round() as i64,
            (v.y * 1000.0).round() as i64,
            (v.z * 1000.0).round() as i64,
        ]
        .hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_comes_from_volume_and_density_with_floor() {
        let piece = DebrisPiece::cuboid(Vec3::splat(0.5), 2_400.0, Vec3::ZERO);
        assert!((piece.mass_kg - 0.125 * 2_400.0).abs() < 1e-3);

        let speck = DebrisPiece::cuboid(Vec3::splat(0.01), 600.0, Vec3::ZERO);
        assert_eq!(speck.mass_kg, MIN_PIECE_MASS_KG);
    }

    #[test]
    fn box_inertia_is_diagonal_and_symmetric_for_cubes() {
        let piece = DebrisPiece::cuboid(Vec3::splat(1.0), 1_200.0, Vec3::ZERO);
        assert!((piece.inertia.x - piece.inertia.y).abs() < 1e-5);
        assert!((piece.inertia.y - piece.inertia.z).abs() < 1e-5);
        // I = m/12 * (1 + 1)
        assert!((piece.inertia.x - piece.mass_kg / 6.0).abs() < 1e-4);
    }

    #[test]
    fn convex_voxelization_fills_a_cube() {
        let piece = DebrisPiece::cuboid(Vec3::ONE, 1_000.0, Vec3::ZERO);
        assert_eq!(piece.voxel_approximation.occupied_count(), 64);
    }

    #[test]
    fn world_aabb_follows_position_and_rotation() {
        let mut piece = DebrisPiece::cuboid(Vec3::new(2.0, 1.0, 1.0), 500.0, Vec3::ZERO);
        piece.position = Vec3::new(10.0, 0.0, 0.0);
        piece.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let bb = piece.world_aabb();
        // The long axis now points along Z.
        assert!((bb.size().z - 2.0).abs() < 1e-4);
        assert!((bb.size().x - 1.0).abs() < 1e-4);
        assert!((bb.center().x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn identical_geometry_shares_a_hash() {
        let a = DebrisPiece::cuboid(Vec3::ONE, 500.0, Vec3::ZERO);
        let b = DebrisPiece::cuboid(Vec3::ONE, 500.0, Vec3::new(5.0, 0.0, 0.0));
        let c = DebrisPiece::cuboid(Vec3::splat(0.5), 500.0, Vec3::ZERO);
        assert_eq!(a.geometry_hash, b.geometry_hash);
        assert_ne!(a.geometry_hash, c.geometry_hash);
    }
}
