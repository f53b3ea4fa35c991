//! Budgeted in-place surface damage: bullet holes, chips, dents.
//!
//! Deforms mesh vertices inside the hole radius along the impact direction
//! with a cone profile. When the per-entity vertex budget would be exceeded
//! the mesh is left untouched and a decal is recorded instead. Every applied
//! displacement is recorded to support merging, repair, and rollback.

use crate::material::{FractureBehavior, MaterialEntry};
use glam::Vec3;
use meshes::MeshData;
use rand::{Rng, SeedableRng};

/// What kind of mark an impact left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceDamageKind {
    BulletHole,
    Chip,
    Dent,
    Scratch,
    Burn,
    Crack,
}

/// One applied deformation.
#[derive(Debug, Clone)]
pub struct DamageRecord {
    pub position: Vec3,
    pub normal: Vec3,
    pub radius: f32,
    pub depth: f32,
    pub kind: SurfaceDamageKind,
    pub affected_vertices: Vec<u32>,
}

/// A mark that never touched geometry (budget exhausted or sub-threshold
/// impact).
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDecal {
    pub position: Vec3,
    pub normal: Vec3,
    pub radius: f32,
    pub kind: SurfaceDamageKind,
}

/// Request to spawn small chip debris around a fresh hole.
#[derive(Debug, Clone, Copy)]
pub struct ChipRequest {
    pub position: Vec3,
    pub normal: Vec3,
    pub count: usize,
    pub chip_size_m: f32,
    pub seed: u64,
}

/// Outcome of a projectile hit on a surface.
#[derive(Debug, Clone)]
pub enum SurfaceDamageOutcome {
    /// Mesh deformed; chips may accompany brittle/granular materials.
    Applied {
        record: DamageRecord,
        chips: Option<ChipRequest>,
    },
    /// Budget exhausted; a decal stands in for geometry.
    Decal(SurfaceDecal),
}

/// Hole radius per joule, capped.
const RADIUS_PER_JOULE: f32 = 2.5e-4;
const MAX_HOLE_RADIUS_M: f32 = 0.12;

/// Per-entity surface damage state.
#[derive(Debug, Clone)]
pub struct SurfaceDamage {
    /// Total vertices this entity may displace before falling back to decals.
    pub budget_vertices: usize,
    displaced: usize,
    records: Vec<DamageRecord>,
}

impl Default for SurfaceDamage {
    fn default() -> Self {
        Self::new(500)
    }
}

impl SurfaceDamage {
    pub fn new(budget_vertices: usize) -> Self {
        Self {
            budget_vertices,
            displaced: 0,
            records: Vec::new(),
        }
    }

    pub fn displaced_vertices(&self) -> usize {
        self.displaced
    }

    pub fn records(&self) -> &[DamageRecord] {
        &self.records
    }

    pub fn remaining_budget(&self) -> usize {
        self.budget_vertices.saturating_sub(self.displaced)
    }

    /// Hole radius from kinetic energy: linear up to a cap.
    pub fn hole_radius(energy_j: f32) -> f32 {
        (energy_j * RADIUS_PER_JOULE).min(MAX_HOLE_RADIUS_M)
    }

    /// Penetration depth: proportional to radius, inversely proportional to
    /// material hardness.
    pub fn penetration_depth(energy_j: f32, hardness: f32) -> f32 {
        Self::hole_radius(energy_j) * 2.0 / hardness.max(0.5)
    }

    /// Apply a projectile hit to `mesh` (positions in the entity's local
    /// space). Stages the affected set first; the mesh is only mutated when
    /// the budget allows the whole hole.
    pub fn apply_projectile_hit(
        &mut self,
        mesh: &mut MeshData,
        impact_point: Vec3,
        impact_dir: Vec3,
        energy_j: f32,
        material: &MaterialEntry,
        seed: u64,
    ) -> SurfaceDamageOutcome {
        let radius = Self::hole_radius(energy_j);
        let depth = Self::penetration_depth(energy_j, material.structural.hardness);
        let dir = impact_dir.normalize_or_zero();
        let normal = -dir;

        let affected: Vec<u32> = mesh
            .vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| Vec3::from(v.position).distance(impact_point) <= radius)
            .map(|(i, _)| i as u32)
            .collect();

        if affected.is_empty() || self.displaced + affected.len() > self.budget_vertices {
            if !affected.is_empty() {
                log::debug!(
                    "surface damage budget exhausted ({}/{}); recording decal",
                    self.displaced,
                    self.budget_vertices
                );
            }
            return SurfaceDamageOutcome::Decal(SurfaceDecal {
                position: impact_point,
                normal,
                radius,
                kind: SurfaceDamageKind::BulletHole,
            });
        }

        // Cone displacement: full depth at the center, zero at the rim.
        for &i in &affected {
            let v = &mut mesh.vertices[i as usize];
            let p = Vec3::from(v.position);
            let t = 1.0 - p.distance(impact_point) / radius;
            let displaced = p + dir * depth * t;
            v.position = displaced.into();
        }
        self.displaced += affected.len();

        let record = DamageRecord {
            position: impact_point,
            normal,
            radius,
            depth,
            kind: SurfaceDamageKind::BulletHole,
            affected_vertices: affected,
        };
        self.records.push(record.clone());

        // Brittle and granular materials chip; fibrous ones throw splinters.
        let chips = matches!(
            material.fracture.behavior,
            FractureBehavior::Brittle | FractureBehavior::Granular | FractureBehavior::Fibrous
        )
        .then(|| {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            ChipRequest {
                position: impact_point,
                normal,
                count: rng.gen_range(3..=8),
                chip_size_m: radius * 0.5,
                seed,
            }
        });

        SurfaceDamageOutcome::Applied { record, chips }
    }

    /// Record a non-deforming mark (burns, scratches) for later merging.
    pub fn record_mark(
        &mut self,
        position: Vec3,
        normal: Vec3,
        radius: f32,
        kind: SurfaceDamageKind,
    ) {
        self.records.push(DamageRecord {
            position,
            normal,
            radius,
            depth: 0.0,
            kind,
            affected_vertices: Vec::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialCatalog;

    fn wood_entry(catalog: &MaterialCatalog) -> &MaterialEntry {
        catalog.get_or_default(catalog.index_of("wood").unwrap())
    }

    /// A rifle-round energy makes a hole of roughly two centimeters.
    #[test]
    fn hole_radius_scales_linearly_to_the_cap() {
        assert!((SurfaceDamage::hole_radius(80.0) - 0.02).abs() < 1e-6);
        assert_eq!(SurfaceDamage::hole_radius(1.0e6), 0.12);
    }

    #[test]
    fn harder_materials_take_shallower_holes() {
        let wood = SurfaceDamage::penetration_depth(80.0, 2.5);
        let glass = SurfaceDamage::penetration_depth(80.0, 6.0);
        assert!(wood > glass);
    }

    #[test]
    fn hit_displaces_vertices_inward_with_cone_profile() {
        let catalog = MaterialCatalog::standard();
        let mut mesh = MeshData::cuboid(Vec3::new(1.0, 1.0, 0.1));
        let mut damage = SurfaceDamage::new(500);

        // Strike the +Z face head-on at a vertex we can track.
        let impact = Vec3::new(0.5, 0.5, 0.05);
        let outcome = damage.apply_projectile_hit(
            &mut mesh,
            impact,
            -Vec3::Z,
            200.0,
            wood_entry(&catalog),
            7,
        );
        match outcome {
            SurfaceDamageOutcome::Applied { record, .. } => {
                assert!(!record.affected_vertices.is_empty());
                assert_eq!(record.kind, SurfaceDamageKind::BulletHole);
                for &i in &record.affected_vertices {
                    // Everything inside the hole moved along -Z.
                    assert!(mesh.vertices[i as usize].position[2] <= 0.05);
                }
                assert_eq!(damage.displaced_vertices(), record.affected_vertices.len());
            }
            SurfaceDamageOutcome::Decal(_) => panic!("budget should allow this hit"),
        }
    }

    #[test]
    fn exhausted_budget_converts_to_decal_without_mutation() {
        let catalog = MaterialCatalog::standard();
        let mut mesh = MeshData::cuboid(Vec3::ONE);
        let before = mesh.clone();
        let mut damage = SurfaceDamage::new(0);

        let outcome = damage.apply_projectile_hit(
            &mut mesh,
            Vec3::new(0.5, 0.5, 0.5),
            -Vec3::Z,
            300.0,
            wood_entry(&catalog),
            7,
        );
        assert!(matches!(outcome, SurfaceDamageOutcome::Decal(_)));
        for (a, b) in mesh.vertices.iter().zip(before.vertices.iter()) {
            assert_eq!(a.position, b.position);
        }
        assert_eq!(damage.displaced_vertices(), 0);
    }

    #[test]
    fn brittle_hits_request_three_to_eight_chips() {
        let catalog = MaterialCatalog::standard();
        let entry = catalog.get_or_default(catalog.index_of("brick").unwrap());
        let mut mesh = MeshData::cuboid(Vec3::ONE);
        let mut damage = SurfaceDamage::new(500);
        let outcome = damage.apply_projectile_hit(
            &mut mesh,
            Vec3::new(0.5, 0.5, 0.5),
            -Vec3::Z,
            400.0,
            entry,
            42,
        );
        match outcome {
            SurfaceDamageOutcome::Applied { chips, .. } => {
                let chips = chips.expect("granular material chips");
                assert!((3..=8).contains(&chips.count));
            }
            _ => panic!("expected applied damage"),
        }
    }
}
