//! Voxel raycasts and walkability queries over the tile world.

use crate::world::TileWorld;
use glam::{IVec3, Vec3};

/// Worst-case voxel steps per ray.
const MAX_RAY_STEPS: u32 = 1000;

/// Lowest tile layer `ground_height` scans.
const GROUND_SCAN_FLOOR: i32 = -100;

/// Result of a voxel raycast.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Distance along the ray to the entry face.
    pub distance: f32,
    /// World-space entry point.
    pub point: Vec3,
    /// Inward face normal (the face the ray crossed).
    pub normal: Vec3,
    /// Tile that was hit.
    pub tile_coord: IVec3,
    pub definition_id: u32,
}

impl TileWorld {
    /// Amanatides–Woo 3D DDA through the tile grid. Visits voxels along the
    /// ray and returns the first tile whose definition has solid collision.
    /// Rays of zero length or zero direction return no hit.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        if max_distance <= 0.0 || direction.length_squared() < 1e-12 {
            return None;
        }
        let dir = direction.normalize();
        let tile_size = self.tile_size();

        let mut coord = self.world_to_tile(origin);

        // Per-axis stepping state.
        let step = IVec3::new(
            if dir.x > 0.0 { 1 } else { -1 },
            if dir.y > 0.0 { 1 } else { -1 },
            if dir.z > 0.0 { 1 } else { -1 },
        );
        let t_delta = Vec3::new(
            if dir.x != 0.0 { tile_size / dir.x.abs() } else { f32::INFINITY },
            if dir.y != 0.0 { tile_size / dir.y.abs() } else { f32::INFINITY },
            if dir.z != 0.0 { tile_size / dir.z.abs() } else { f32::INFINITY },
        );
        let next_boundary = |c: i32, s: i32| -> f32 {
            if s > 0 {
                (c + 1) as f32 * tile_size
            } else {
                c as f32 * tile_size
            }
        };
        let axis_t_max = |o: f32, d: f32, c: i32, s: i32| -> f32 {
            if d != 0.0 {
                (next_boundary(c, s) - o) / d
            } else {
                f32::INFINITY
            }
        };
        let mut t_max = Vec3::new(
            axis_t_max(origin.x, dir.x, coord.x, step.x),
            axis_t_max(origin.y, dir.y, coord.y, step.y),
            axis_t_max(origin.z, dir.z, coord.z, step.z),
        );

        // The tile containing the origin counts as visited at t = 0; its
        // normal opposes the dominant ray axis.
        let mut t_entry = 0.0_f32;
        let mut entry_normal = {
            let a = dir.abs();
            if a.x >= a.y && a.x >= a.z {
                Vec3::new(-step.x as f32, 0.0, 0.0)
            } else if a.y >= a.z {
                Vec3::new(0.0, -step.y as f32, 0.0)
            } else {
                Vec3::new(0.0, 0.0, -step.z as f32)
            }
        };

        for _ in 0..MAX_RAY_STEPS {
            if t_entry > max_distance {
                return None;
            }
            if let Some(tile) = self.tile_at(coord) {
                if tile.is_active {
                    if let Some(def) = self.definition_of(tile) {
                        if def.collision_type.is_solid() {
                            return Some(RayHit {
                                distance: t_entry,
                                point: origin + dir * t_entry,
                                normal: entry_normal,
                                tile_coord: coord,
                                definition_id: def.id,
                            });
                        }
                    }
                }
            }

            // Advance to the next voxel across the nearest boundary.
            if t_max.x <= t_max.y && t_max.x <= t_max.z {
                t_entry = t_max.x;
                coord.x += step.x;
                t_max.x += t_delta.x;
                entry_normal = Vec3::new(-step.x as f32, 0.0, 0.0);
            } else if t_max.y <= t_max.z {
                t_entry = t_max.y;
                coord.y += step.y;
                t_max.y += t_delta.y;
                entry_normal = Vec3::new(0.0, -step.y as f32, 0.0);
            } else {
                t_entry = t_max.z;
                coord.z += step.z;
                t_max.z += t_delta.z;
                entry_normal = Vec3::new(0.0, 0.0, -step.z as f32);
            }
        }
        None
    }

    /// True iff the tile containing `p` is absent or marked walkable.
    pub fn is_walkable(&self, p: Vec3) -> bool {
        match self.tile_at(self.world_to_tile(p)) {
            None => true,
            Some(tile) => self
                .definition_of(tile)
                .map(|d| d.walkable)
                .unwrap_or(true),
        }
    }

    /// Top surface height of the highest walkable tile in the column,
    /// scanning downward from layer 0. Returns the scan floor when the
    /// column is empty.
    pub fn ground_height(&self, x: f32, z: f32) -> f32 {
        let tx = (x / self.tile_size()).floor() as i32;
        let tz = (z / self.tile_size()).floor() as i32;
        for ty in (GROUND_SCAN_FLOOR..=0).rev() {
            let coord = IVec3::new(tx, ty, tz);
            if let Some(tile) = self.tile_at(coord) {
                if self.definition_of(tile).map(|d| d.walkable).unwrap_or(false) {
                    return (ty + 1) as f32 * self.tile_size();
                }
            }
        }
        GROUND_SCAN_FLOOR as f32
    }
}
