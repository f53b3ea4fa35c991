//! Approach selection: the only reader of the energy thresholds.

use fracture::ImpactKind;
use glam::Vec3;
use structural::StructuralMaterial;

/// What an impact does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractureApproach {
    /// Record a decal; the projectile embeds or ricochets.
    NoFracture,
    /// Deform the surface in place; possibly spawn chips.
    SurfaceDamage,
    /// Voronoi-fracture a local region only.
    PartialFracture,
    /// Fracture the entire mesh and destroy the source entity.
    FullFracture,
}

/// A queued impact awaiting dispatch.
#[derive(Debug, Clone, Copy)]
pub struct ImpactEvent {
    pub target: hecs::Entity,
    pub point: Vec3,
    pub direction: Vec3,
    pub energy_j: f32,
    pub kind: ImpactKind,
}

/// Threshold table. Gates scale with the target's fracture toughness; every
/// other component receives pre-decided instructions.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Below this (scaled): decal only.
    pub no_fracture_max_j: f32,
    /// Below this (scaled): surface damage.
    pub surface_damage_max_j: f32,
    /// Below this (scaled): partial fracture; at or above: full.
    pub partial_fracture_max_j: f32,
    /// Energy gates multiply by `fracture_toughness × this`. Tougher
    /// materials shrug off energies that shatter weaker ones.
    pub toughness_gate_factor: f32,
    /// Half-extent of the region a partial fracture carves out [m].
    pub partial_region_half_extent_m: f32,
    /// Decal ring buffer capacity.
    pub max_decals: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            no_fracture_max_j: 10.0,
            surface_damage_max_j: 100.0,
            partial_fracture_max_j: 500.0,
            toughness_gate_factor: 2.0,
            partial_region_half_extent_m: 0.5,
            max_decals: 256,
        }
    }
}

/// Classify an impact. Boundary rule: energy exactly at a threshold selects
/// the higher approach.
pub fn determine_approach(
    config: &DispatcherConfig,
    energy_j: f32,
    material: &StructuralMaterial,
) -> FractureApproach {
    let scale = (material.fracture_toughness * config.toughness_gate_factor).max(1e-3);
    if energy_j < config.no_fracture_max_j * scale {
        FractureApproach::NoFracture
    } else if energy_j < config.surface_damage_max_j * scale {
        FractureApproach::SurfaceDamage
    } else if energy_j < config.partial_fracture_max_j * scale {
        FractureApproach::PartialFracture
    } else {
        FractureApproach::FullFracture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use structural::MaterialCatalog;

    fn material(name: &str) -> StructuralMaterial {
        let catalog = MaterialCatalog::standard();
        catalog
            .get_or_default(catalog.index_of(name).unwrap())
            .structural
            .clone()
    }

    /// A 15 J pistol round only scuffs concrete.
    #[test]
    fn low_energy_on_concrete_is_no_fracture() {
        let config = DispatcherConfig::default();
        let concrete = material("concrete");
        assert_eq!(
            determine_approach(&config, 15.0, &concrete),
            FractureApproach::NoFracture
        );
    }

    /// An 80 J rifle round chews the surface of a wood plank.
    #[test]
    fn rifle_round_on_wood_is_surface_damage() {
        let config = DispatcherConfig::default();
        let wood = material("wood");
        assert_eq!(
            determine_approach(&config, 80.0, &wood),
            FractureApproach::SurfaceDamage
        );
    }

    /// A 1200 J grenade takes a brick wall apart entirely.
    #[test]
    fn grenade_on_brick_is_full_fracture() {
        let config = DispatcherConfig::default();
        let brick = material("brick");
        assert_eq!(
            determine_approach(&config, 1_200.0, &brick),
            FractureApproach::FullFracture
        );
    }

    /// Energy exactly at a gate picks the higher approach.
    #[test]
    fn exact_threshold_selects_the_higher_approach() {
        let config = DispatcherConfig::default();
        let brick = material("brick"); // toughness 1.0 → scale 2.0
        let surface_gate = config.no_fracture_max_j * 2.0;
        assert_eq!(
            determine_approach(&config, surface_gate, &brick),
            FractureApproach::SurfaceDamage
        );
        let full_gate = config.partial_fracture_max_j * 2.0;
        assert_eq!(
            determine_approach(&config, full_gate, &brick),
            FractureApproach::FullFracture
        );
    }

    /// Tougher materials need more energy for the same approach.
    #[test]
    fn toughness_raises_the_gates() {
        let config = DispatcherConfig::default();
        let steel = material("steel");
        let glass = material("glass");
        assert_eq!(
            determine_approach(&config, 600.0, &steel),
            FractureApproach::NoFracture
        );
        assert_eq!(
            determine_approach(&config, 1_200.0, &glass),
            FractureApproach::FullFracture
        );
    }
}
