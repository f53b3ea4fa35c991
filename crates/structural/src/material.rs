//! Structural material records and the data-driven catalog.
//!
//! New materials are configured data, not new code paths: tiles reference a
//! catalog index, and every simulator reads the same records.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// SI-valued bulk material description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralMaterial {
    /// Density [kg/m³].
    pub density: f32,
    /// Young's modulus [Pa].
    pub young_modulus: f32,
    pub poisson_ratio: f32,
    /// Strengths [Pa].
    pub tensile_strength: f32,
    pub compressive_strength: f32,
    pub shear_strength: f32,
    pub yield_strength: f32,
    pub ultimate_strength: f32,
    /// Fracture toughness [MPa·√m]; scales the dispatcher's energy gates.
    pub fracture_toughness: f32,
    /// Mohs hardness.
    pub hardness: f32,
    /// Ductility in [0, 1].
    pub ductility: f32,
    pub is_brittle: bool,
    /// Multiplier on `energy / 1000` when decrementing tile health.
    pub impact_damage_factor: f32,
}

/// How a material comes apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FractureBehavior {
    Brittle,
    Ductile,
    Fibrous,
    Granular,
}

/// Fragmentation tuning per material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FractureProperties {
    pub behavior: FractureBehavior,
    pub min_pieces: usize,
    pub max_pieces: usize,
    /// Fragment size spread in [0, 1].
    pub size_variance: f32,
    /// How strongly cracks radiate from the impact point, [0, 1].
    pub radial_pattern_strength: f32,
    /// Tendency to split along grain planes, [0, 1].
    pub planar_tendency: f32,
    pub edge_sharpness: f32,
    pub surface_roughness: f32,
    /// Full-shatter materials leave nothing standing.
    pub shatter_completely: bool,
    /// Grain direction; zero for isotropic materials.
    pub grain_direction: Vec3,
}

/// A named catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialEntry {
    pub name: String,
    pub structural: StructuralMaterial,
    pub fracture: FractureProperties,
}

/// Indexed material store; tile definitions carry indices into this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialCatalog {
    entries: Vec<MaterialEntry>,
}

impl MaterialCatalog {
    pub fn new(entries: Vec<MaterialEntry>) -> Self {
        Self { entries }
    }

    /// The built-in catalog: concrete, brick, wood, steel, glass.
    pub fn standard() -> Self {
        Self::new(vec![
            MaterialEntry {
                name: "concrete".into(),
                structural: StructuralMaterial {
                    density: 2_400.0,
                    young_modulus: 30.0e9,
                    poisson_ratio: 0.2,
                    tensile_strength: 3.0e6,
                    compressive_strength: 40.0e6,
                    shear_strength: 6.0e6,
                    yield_strength: 30.0e6,
                    ultimate_strength: 42.0e6,
                    fracture_toughness: 1.5,
                    hardness: 5.5,
                    ductility: 0.05,
                    is_brittle: true,
                    impact_damage_factor: 1.3,
                },
                fracture: FractureProperties {
                    behavior: FractureBehavior::Brittle,
                    min_pieces: 5,
                    max_pieces: 15,
                    size_variance: 0.5,
                    radial_pattern_strength: 0.8,
                    planar_tendency: 0.0,
                    edge_sharpness: 0.7,
                    surface_roughness: 0.6,
                    shatter_completely: false,
                    grain_direction: Vec3::ZERO,
                },
            },
            MaterialEntry {
                name: "brick".into(),
                structural: StructuralMaterial {
                    density: 1_900.0,
                    young_modulus: 17.0e9,
                    poisson_ratio: 0.2,
                    tensile_strength: 2.0e6,
                    compressive_strength: 20.0e6,
                    shear_strength: 4.0e6,
                    yield_strength: 15.0e6,
                    ultimate_strength: 22.0e6,
                    fracture_toughness: 1.0,
                    hardness: 4.0,
                    ductility: 0.04,
                    is_brittle: true,
                    impact_damage_factor: 1.4,
                },
                fracture: FractureProperties {
                    behavior: FractureBehavior::Granular,
                    min_pieces: 5,
                    max_pieces: 15,
                    size_variance: 0.6,
                    radial_pattern_strength: 0.6,
                    planar_tendency: 0.2,
                    edge_sharpness: 0.5,
                    surface_roughness: 0.8,
                    shatter_completely: false,
                    grain_direction: Vec3::ZERO,
                },
            },
            MaterialEntry {
                name: "wood".into(),
                structural: StructuralMaterial {
                    density: 600.0,
                    young_modulus: 11.0e9,
                    poisson_ratio: 0.35,
                    tensile_strength: 40.0e6,
                    compressive_strength: 35.0e6,
                    shear_strength: 7.0e6,
                    yield_strength: 30.0e6,
                    ultimate_strength: 45.0e6,
                    fracture_toughness: 0.5,
                    hardness: 2.5,
                    ductility: 0.3,
                    is_brittle: false,
                    impact_damage_factor: 1.0,
                },
                fracture: FractureProperties {
                    behavior: FractureBehavior::Fibrous,
                    min_pieces: 3,
                    max_pieces: 10,
                    size_variance: 0.7,
                    radial_pattern_strength: 0.3,
                    planar_tendency: 0.9,
                    edge_sharpness: 0.9,
                    surface_roughness: 0.9,
                    shatter_completely: false,
                    grain_direction: Vec3::Y,
                },
            },
            MaterialEntry {
                name: "steel".into(),
                structural: StructuralMaterial {
                    density: 7_850.0,
                    young_modulus: 200.0e9,
                    poisson_ratio: 0.3,
                    tensile_strength: 400.0e6,
                    compressive_strength: 400.0e6,
                    shear_strength: 240.0e6,
                    yield_strength: 250.0e6,
                    ultimate_strength: 450.0e6,
                    fracture_toughness: 50.0,
                    hardness: 4.5,
                    ductility: 0.9,
                    is_brittle: false,
                    impact_damage_factor: 0.3,
                },
                fracture: FractureProperties {
                    behavior: FractureBehavior::Ductile,
                    min_pieces: 2,
                    max_pieces: 6,
                    size_variance: 0.3,
                    radial_pattern_strength: 0.2,
                    planar_tendency: 0.0,
                    edge_sharpness: 0.3,
                    surface_roughness: 0.2,
                    shatter_completely: false,
                    grain_direction: Vec3::ZERO,
                },
            },
            MaterialEntry {
                name: "glass".into(),
                structural: StructuralMaterial {
                    density: 2_500.0,
                    young_modulus: 70.0e9,
                    poisson_ratio: 0.22,
                    tensile_strength: 33.0e6,
                    compressive_strength: 1_000.0e6,
                    shear_strength: 25.0e6,
                    yield_strength: 33.0e6,
                    ultimate_strength: 33.0e6,
                    fracture_toughness: 0.7,
                    hardness: 6.0,
                    ductility: 0.0,
                    is_brittle: true,
                    impact_damage_factor: 2.0,
                },
                fracture: FractureProperties {
                    behavior: FractureBehavior::Brittle,
                    min_pieces: 8,
                    max_pieces: 24,
                    size_variance: 0.8,
                    radial_pattern_strength: 1.0,
                    planar_tendency: 0.0,
                    edge_sharpness: 1.0,
                    surface_roughness: 0.1,
                    shatter_completely: true,
                    grain_direction: Vec3::ZERO,
                },
            },
        ])
    }

    pub fn get(&self, index: u32) -> Option<&MaterialEntry> {
        self.entries.get(index as usize)
    }

    /// Catalog lookup with the concrete entry as fallback.
    pub fn get_or_default(&self, index: u32) -> &MaterialEntry {
        self.entries
            .get(index as usize)
            .unwrap_or_else(|| &self.entries[0])
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .map(|i| i as u32)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_contains_expected_materials() {
        let catalog = MaterialCatalog::standard();
        let concrete = catalog.get(catalog.index_of("concrete").unwrap()).unwrap();
        assert_eq!(concrete.structural.density, 2_400.0);
        assert_eq!(concrete.structural.fracture_toughness, 1.5);
        assert!(concrete.structural.is_brittle);

        let wood = catalog.get(catalog.index_of("wood").unwrap()).unwrap();
        assert_eq!(wood.fracture.behavior, FractureBehavior::Fibrous);
        assert!(wood.fracture.grain_direction.length() > 0.0);

        let glass = catalog.get(catalog.index_of("glass").unwrap()).unwrap();
        assert!(glass.fracture.shatter_completely);
    }

    #[test]
    fn out_of_range_index_falls_back_to_first_entry() {
        let catalog = MaterialCatalog::standard();
        assert_eq!(catalog.get_or_default(999).name, "concrete");
    }
}
