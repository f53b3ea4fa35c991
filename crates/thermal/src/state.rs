//! Per-entity thermal and chemical records.

use crate::{MAX_TEMPERATURE_K, MIN_TEMPERATURE_K};

/// Thermodynamic phase of an entity's bulk material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Solid,
    Liquid,
    Gas,
}

/// Thermal state component. All quantities SI.
#[derive(Debug, Clone)]
pub struct ThermalState {
    pub temperature_k: f32,
    pub mass_kg: f32,
    pub surface_area_m2: f32,
    /// Specific heat capacity [J/(kg·K)].
    pub specific_heat: f32,
    /// Thermal conductivity [W/(m·K)].
    pub conductivity: f32,
    /// Emissivity in [0, 1].
    pub emissivity: f32,
    pub melting_k: f32,
    pub boiling_k: f32,
    /// Auto-ignition temperature; `f32::INFINITY` for non-combustibles.
    pub ignition_k: f32,
    pub phase: Phase,
    /// Latent heat of fusion [J/kg].
    pub latent_heat_fusion: f32,
    /// Latent heat of vaporization [J/kg].
    pub latent_heat_vaporization: f32,
}

impl ThermalState {
    /// Room-temperature state with the given bulk properties.
    pub fn new(mass_kg: f32, surface_area_m2: f32, specific_heat: f32, conductivity: f32) -> Self {
        Self {
            temperature_k: 293.15,
            mass_kg,
            surface_area_m2,
            specific_heat,
            conductivity,
            emissivity: 0.9,
            melting_k: 1_700.0,
            boiling_k: 3_000.0,
            ignition_k: f32::INFINITY,
            phase: Phase::Solid,
            latent_heat_fusion: 2.0e5,
            latent_heat_vaporization: 2.0e6,
        }
    }

    /// Wood-like preset: ignites at 573 K.
    pub fn wood(mass_kg: f32, surface_area_m2: f32) -> Self {
        Self {
            ignition_k: 573.0,
            melting_k: f32::INFINITY, // chars, never melts
            boiling_k: f32::INFINITY,
            emissivity: 0.9,
            ..Self::new(mass_kg, surface_area_m2, 1_700.0, 0.15)
        }
    }

    /// Steel-like preset.
    pub fn steel(mass_kg: f32, surface_area_m2: f32) -> Self {
        Self {
            melting_k: 1_811.0,
            boiling_k: 3_134.0,
            emissivity: 0.35,
            latent_heat_fusion: 2.7e5,
            latent_heat_vaporization: 6.1e6,
            ..Self::new(mass_kg, surface_area_m2, 490.0, 45.0)
        }
    }

    /// Add heat energy in joules; returns the resulting temperature before
    /// clamping so overflow can be reported.
    pub fn add_heat(&mut self, joules: f32) -> f32 {
        let heat_capacity = (self.mass_kg * self.specific_heat).max(1e-6);
        self.temperature_k += joules / heat_capacity;
        self.temperature_k
    }

    /// True when the unclamped temperature left the legal range.
    pub fn clamp_temperature(&mut self) -> bool {
        let before = self.temperature_k;
        self.temperature_k = self
            .temperature_k
            .clamp(MIN_TEMPERATURE_K, MAX_TEMPERATURE_K);
        !self.temperature_k.is_finite() || before != self.temperature_k
    }
}

/// What an entity is made of, chemically. Drives ignition and combustion.
#[derive(Debug, Clone)]
pub struct ChemicalComposition {
    pub combustible: bool,
    /// Moles of oxygen consumed per kilogram of fuel.
    pub oxygen_demand_mol_per_kg: f32,
    /// Heat of combustion [J/kg].
    pub heat_of_combustion: f32,
    /// Mass fraction leaving as soot.
    pub soot_fraction: f32,
    /// Mass fraction remaining as ash.
    pub ash_fraction: f32,
    /// Per-material fire spread constant in [0, 1].
    pub flammability: f32,
}

impl ChemicalComposition {
    pub fn inert() -> Self {
        Self {
            combustible: false,
            oxygen_demand_mol_per_kg: 0.0,
            heat_of_combustion: 0.0,
            soot_fraction: 0.0,
            ash_fraction: 1.0,
            flammability: 0.0,
        }
    }

    pub fn wood() -> Self {
        Self {
            combustible: true,
            oxygen_demand_mol_per_kg: 33.0,
            heat_of_combustion: 1.5e7,
            soot_fraction: 0.05,
            ash_fraction: 0.02,
            flammability: 0.6,
        }
    }
}

/// Active fire attached to an entity. Created by auto-ignition or spread,
/// removed when fuel runs out.
#[derive(Debug, Clone)]
pub struct Combustion {
    pub active: bool,
    pub fuel_remaining_kg: f32,
    /// Nominal fuel burn rate [kg/s], before oxygen limiting.
    pub consumption_rate: f32,
    pub flame_temperature_k: f32,
    /// Radius within which this fire can ignite neighbors.
    pub ignition_radius_m: f32,
    pub oxygen_consumption_mol_s: f32,
    /// Particles per second the effects system should emit.
    pub smoke_spawn_rate: f32,
    pub ember_spawn_rate: f32,
    /// Effective flame geometry for rendering and spread checks.
    pub flame_height_m: f32,
    pub flame_radius_m: f32,
    /// Accumulated, un-drained effluent counts (rate × dt).
    pub smoke_pending: f32,
    pub ember_pending: f32,
}

impl Combustion {
    /// Fire sized for the given fuel mass.
    pub fn for_fuel(fuel_kg: f32) -> Self {
        let scale = (fuel_kg / 10.0).clamp(0.2, 3.0);
        Self {
            active: true,
            fuel_remaining_kg: fuel_kg,
            consumption_rate: 0.02 * scale,
            flame_temperature_k: 1_200.0,
            ignition_radius_m: 1.5 * scale,
            oxygen_consumption_mol_s: 0.6 * scale,
            smoke_spawn_rate: 8.0 * scale,
            ember_spawn_rate: 2.0 * scale,
            flame_height_m: 1.0 * scale,
            flame_radius_m: 0.4 * scale,
            smoke_pending: 0.0,
            ember_pending: 0.0,
        }
    }

    /// Drain whole pending smoke particles.
    pub fn take_smoke(&mut self) -> u32 {
        let n = self.smoke_pending.floor();
        self.smoke_pending -= n;
        n as u32
    }

    /// Drain whole pending embers.
    pub fn take_embers(&mut self) -> u32 {
        let n = self.ember_pending.floor();
        self.ember_pending -= n;
        n as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_heat_scales_by_heat_capacity() {
        let mut s = ThermalState::new(2.0, 1.0, 500.0, 1.0);
        s.add_heat(1_000.0);
        assert!((s.temperature_k - (293.15 + 1.0)).abs() < 1e-3);
    }

    #[test]
    fn clamp_reports_overflow_once_asked() {
        let mut s = ThermalState::new(1.0, 1.0, 500.0, 1.0);
        s.temperature_k = 1.0e9;
        assert!(s.clamp_temperature());
        assert_eq!(s.temperature_k, crate::MAX_TEMPERATURE_K);
        assert!(!s.clamp_temperature());
    }

    #[test]
    fn effluent_drain_keeps_fractional_remainder() {
        let mut c = Combustion::for_fuel(10.0);
        c.smoke_pending = 2.7;
        assert_eq!(c.take_smoke(), 2);
        assert!((c.smoke_pending - 0.7).abs() < 1e-6);
    }
}
