//! Bounded Voronoi cells as convex polyhedra.
//!
//! Each cell starts as the source bounds and is cut down by the
//! perpendicular-bisector half-space against every other seed. Faces are
//! stored as outward-wound convex polygon loops; clipping is
//! Sutherland–Hodgman per face plus a cap face over the cut.

use glam::Vec3;
use meshes::{Aabb, MeshData, Vertex};

const EPS: f32 = 1e-5;

/// Convex polyhedron with outward-wound polygon faces.
#[derive(Debug, Clone)]
pub struct Polyhedron {
    pub faces: Vec<Vec<Vec3>>,
}

impl Polyhedron {
    /// The box polyhedron for an AABB.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        let c = aabb.center();
        let h = aabb.half_extents();
        let axes: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, -Vec3::X, Vec3::Y),
            (Vec3::Y, Vec3::X, -Vec3::Z),
            (-Vec3::Y, Vec3::X, Vec3::Z),
            (Vec3::X, -Vec3::Z, Vec3::Y),
            (-Vec3::X, Vec3::Z, Vec3::Y),
        ];
        let faces = axes
            .iter()
            .map(|&(n, u, v)| {
                let fc = c + n * n.abs().dot(h);
                let uu = u * u.abs().dot(h);
                let vv = v * v.abs().dot(h);
                vec![fc - uu - vv, fc + uu - vv, fc + uu + vv, fc - uu + vv]
            })
            .collect();
        Self { faces }
    }

    /// Keep the region where `normal · (x − point) ≤ 0`.
    pub fn clip(&mut self, normal: Vec3, point: Vec3) {
        let mut new_faces: Vec<Vec<Vec3>> = Vec::with_capacity(self.faces.len() + 1);
        let mut cap_points: Vec<Vec3> = Vec::new();

        for face in &self.faces {
            let mut out: Vec<Vec3> = Vec::new();
            for i in 0..face.len() {
                let a = face[i];
                let b = face[(i + 1) % face.len()];
                let da = normal.dot(a - point);
                let db = normal.dot(b - point);
                if da <= EPS {
                    out.push(a);
                }
                if (da < -EPS && db > EPS) || (da > EPS && db < -EPS) {
                    let t = da / (da - db);
                    let x = a + (b - a) * t;
                    out.push(x);
                    cap_points.push(x);
                }
            }
            if out.len() >= 3 {
                new_faces.push(out);
            }
        }

        // Close the cut with a cap face wound so its normal matches the
        // clipping normal (outward for the kept region).
        if cap_points.len() >= 3 {
            let mut unique: Vec<Vec3> = Vec::with_capacity(cap_points.len());
            for p in cap_points {
                if !unique.iter().any(|q| q.distance_squared(p) < EPS * EPS) {
                    unique.push(p);
                }
            }
            if unique.len() >= 3 {
                let centroid: Vec3 =
                    unique.iter().copied().sum::<Vec3>() / unique.len() as f32;
                let u = (unique[0] - centroid).normalize_or_zero();
                let v = normal.cross(u).normalize_or_zero();
                unique.sort_by(|a, b| {
                    let pa = *a - centroid;
                    let pb = *b - centroid;
                    let angle_a = pa.dot(v).atan2(pa.dot(u));
                    let angle_b = pb.dot(v).atan2(pb.dot(u));
                    angle_a
                        .partial_cmp(&angle_b)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                // Verify winding against the clip normal; flip if needed.
                if unique.len() >= 3 {
                    let n = (unique[1] - unique[0]).cross(unique[2] - unique[0]);
                    if n.dot(normal) < 0.0 {
                        unique.reverse();
                    }
                    new_faces.push(unique);
                }
            }
        }

        self.faces = new_faces;
    }

    /// A polyhedron degenerates when clipping leaves fewer than four faces.
    pub fn is_degenerate(&self) -> bool {
        self.faces.len() < 4
    }

    /// Signed volume by the divergence theorem over fan-triangulated faces.
    /// Outward winding yields a positive value.
    pub fn volume(&self) -> f32 {
        let mut six_v = 0.0_f32;
        for face in &self.faces {
            for i in 1..face.len() - 1 {
                six_v += face[0].dot(face[i].cross(face[i + 1]));
            }
        }
        six_v / 6.0
    }

    pub fn centroid(&self) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for face in &self.faces {
            for &p in face {
                sum += p;
                count += 1;
            }
        }
        if count == 0 {
            Vec3::ZERO
        } else {
            sum / count as f32
        }
    }

    pub fn aabb(&self) -> Aabb {
        let mut bb = Aabb::empty();
        for face in &self.faces {
            for &p in face {
                bb.grow(p);
            }
        }
        bb
    }

    /// Flat-shaded triangle mesh: faces fan-triangulated with per-face
    /// normals and UVs planar-projected along the fragment's dominant axis.
    /// `displace` lets the caller roughen vertices along the face normal.
    pub fn to_mesh<F>(&self, mut displace: F) -> MeshData
    where
        F: FnMut(Vec3, Vec3) -> f32,
    {
        let bb = self.aabb();
        let size = bb.size().max(Vec3::splat(1e-4));
        // Project UVs across the two longest extents.
        let dominant = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };
        let uv_of = |p: Vec3| -> [f32; 2] {
            let rel = (p - bb.min) / size;
            match dominant {
                0 => [rel.y, rel.z],
                1 => [rel.x, rel.z],
                _ => [rel.x, rel.y],
            }
        };

        let mut mesh = MeshData::new();
        for face in &self.faces {
            if face.len() < 3 {
                continue;
            }
            let normal = polygon_normal(face);
            let base = mesh.vertices.len() as u32;
            for &p in face {
                let displaced = p + normal * displace(p, normal);
                mesh.vertices
                    .push(Vertex::new(displaced.into(), normal.into(), uv_of(p)));
            }
            for i in 1..face.len() as u32 - 1 {
                mesh.indices.extend_from_slice(&[base, base + i, base + i + 1]);
            }
        }
        mesh
    }
}

/// Newell normal of an outward-wound polygon.
fn polygon_normal(face: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for i in 0..face.len() {
        let a = face[i];
        let b = face[(i + 1) % face.len()];
        n += Vec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        );
    }
    n.normalize_or_zero()
}

/// Build the bounded Voronoi diagram: one cell per seed, clipped by every
/// other seed's perpendicular bisector. Degenerate (empty) cells are
/// discarded.
pub fn build_cells(seeds: &[Vec3], bounds: &Aabb) -> Vec<Polyhedron> {
    let mut cells = Vec::with_capacity(seeds.len());
    for (i, &seed) in seeds.iter().enumerate() {
        let mut cell = Polyhedron::from_aabb(bounds);
        for (j, &other) in seeds.iter().enumerate() {
            if i == j {
                continue;
            }
            let delta = other - seed;
            if delta.length_squared() < EPS * EPS {
                continue;
            }
            let normal = delta.normalize();
            let midpoint = (seed + other) * 0.5;
            cell.clip(normal, midpoint);
            if cell.is_degenerate() {
                break;
            }
        }
        if !cell.is_degenerate() && cell.volume() > EPS {
            cells.push(cell);
        } else {
            log::debug!("voronoi: discarded empty cell for seed {}", i);
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_polyhedron_volume_matches_aabb() {
        let bb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 3.0, 4.0));
        let poly = Polyhedron::from_aabb(&bb);
        assert_eq!(poly.faces.len(), 6);
        assert!((poly.volume() - 24.0).abs() < 1e-3);
        assert!((poly.centroid() - Vec3::new(1.0, 1.5, 2.0)).length() < 1e-4);
    }

    #[test]
    fn clipping_a_box_in_half_halves_its_volume() {
        let bb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut poly = Polyhedron::from_aabb(&bb);
        poly.clip(Vec3::X, Vec3::ZERO);
        assert!((poly.volume() - 4.0).abs() < 1e-3, "volume {}", poly.volume());
        // 5 original faces survive (one fully removed) plus the cap.
        assert_eq!(poly.faces.len(), 6);
        let cell_bb = poly.aabb();
        assert!(cell_bb.max.x <= 1e-4);
    }

    #[test]
    fn clipping_away_everything_degenerates() {
        let bb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut poly = Polyhedron::from_aabb(&bb);
        poly.clip(Vec3::X, Vec3::new(-2.0, 0.0, 0.0));
        assert!(poly.is_degenerate());
    }

    #[test]
    fn two_seed_cells_partition_the_bounds() {
        let bb = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let seeds = [Vec3::new(0.5, 1.0, 1.0), Vec3::new(1.5, 1.0, 1.0)];
        let cells = build_cells(&seeds, &bb);
        assert_eq!(cells.len(), 2);
        let total: f32 = cells.iter().map(|c| c.volume()).sum();
        assert!((total - 8.0).abs() < 1e-2, "cells cover the box: {total}");
        // The bisector plane at x = 1 separates them.
        assert!(cells[0].aabb().max.x <= 1.0 + 1e-3);
        assert!(cells[1].aabb().min.x >= 1.0 - 1e-3);
    }

    #[test]
    fn many_cells_conserve_total_volume() {
        let bb = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let seeds = [
            Vec3::new(0.3, 0.4, 0.5),
            Vec3::new(1.6, 0.5, 0.7),
            Vec3::new(0.8, 1.5, 1.2),
            Vec3::new(1.2, 1.0, 1.8),
            Vec3::new(0.4, 1.7, 0.3),
        ];
        let cells = build_cells(&seeds, &bb);
        assert_eq!(cells.len(), 5);
        let total: f32 = cells.iter().map(|c| c.volume()).sum();
        assert!((total - 8.0).abs() < 0.05, "partition sums to bounds: {total}");
    }

    #[test]
    fn cell_mesh_is_closed_and_renderable() {
        let bb = Aabb::new(Vec3::ZERO, Vec3::splat(1.0));
        let seeds = [Vec3::new(0.3, 0.3, 0.3), Vec3::new(0.7, 0.7, 0.7)];
        let cells = build_cells(&seeds, &bb);
        for cell in &cells {
            let mesh = cell.to_mesh(|_, _| 0.0);
            assert!(mesh.triangle_count() >= 4);
            // Every index valid.
            for &i in &mesh.indices {
                assert!((i as usize) < mesh.vertices.len());
            }
        }
    }
}
