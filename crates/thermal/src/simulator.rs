//! Fixed-rate thermal, combustion, and fire-spread update.

use crate::grid::SpatialGrid;
use crate::state::{ChemicalComposition, Combustion, Phase, ThermalState};
use crate::{CONTACT_AREA_M2, STEFAN_BOLTZMANN};
use engine_core::{Anatomy, FixedStep, Health, Transform};
use glam::Vec3;
use hecs::{Entity, World};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Tuning for the thermal simulator. Constructed once and passed at creation.
#[derive(Debug, Clone)]
pub struct ThermalConfig {
    /// Fixed update rate.
    pub update_hz: f32,
    /// Neighbor grid cell size.
    pub cell_size_m: f32,
    /// Per-entity neighbor cap; closest win.
    pub max_neighbors: usize,
    pub conduction_range_m: f32,
    pub radiation_range_m: f32,
    pub ambient_k: f32,
    /// Convective film coefficient [W/(m²·K)].
    pub convection_coeff: f32,
    /// Phase transition hysteresis band.
    pub hysteresis_k: f32,
    /// Anatomical entities hotter than this take damage.
    pub burn_threshold_k: f32,
    /// Health lost per second per kelvin over the threshold.
    pub burn_damage_rate: f32,
    /// Fire spread check cadence.
    pub spread_interval_s: f32,
    /// Accepted for forward compatibility; spread currently does not trace
    /// sight lines.
    pub require_line_of_sight: bool,
    /// Ambient oxygen available to fires [mol/m³].
    pub ambient_oxygen_mol_m3: f32,
    /// Seed for spread rolls; fixed seeds give reproducible runs.
    pub seed: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            update_hz: 30.0,
            cell_size_m: 2.0,
            max_neighbors: 12,
            conduction_range_m: 1.5,
            radiation_range_m: 8.0,
            ambient_k: 293.15,
            convection_coeff: 10.0,
            hysteresis_k: 5.0,
            burn_threshold_k: 340.0,
            burn_damage_rate: 0.002,
            spread_interval_s: 0.5,
            require_line_of_sight: false,
            ambient_oxygen_mol_m3: 8.6,
            seed: 0,
        }
    }
}

/// Immutable per-entity snapshot taken at the top of a step so the heat
/// gather can run in parallel against a stable view.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    entity: Entity,
    position: Vec3,
    temperature_k: f32,
    conductivity: f32,
    emissivity: f32,
    surface_area_m2: f32,
}

/// The thermal/chemical simulator. Owns its neighbor grid and cadences.
pub struct ThermalSimulator {
    config: ThermalConfig,
    step: FixedStep,
    spread: FixedStep,
    grid: SpatialGrid,
    rng: rand::rngs::StdRng,
    /// Entities whose temperature clamp has already been logged this session.
    clamp_logged: HashSet<Entity>,
}

impl ThermalSimulator {
    pub fn new(config: ThermalConfig) -> Self {
        Self {
            step: FixedStep::from_hz(config.update_hz),
            spread: FixedStep::from_period(config.spread_interval_s),
            grid: SpatialGrid::new(config.cell_size_m),
            rng: rand::rngs::StdRng::seed_from_u64(config.seed),
            clamp_logged: HashSet::new(),
            config,
        }
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    /// Advance by frame time; runs zero or more fixed steps plus any due
    /// spread checks.
    pub fn update(&mut self, world: &mut World, dt: f32) {
        self.step.accumulate(dt);
        let step_dt = self.step.step_seconds();
        while self.step.tick() {
            self.step_once(world, step_dt);
        }
        self.spread.accumulate(dt);
        while self.spread.tick() {
            self.spread_fire(world);
        }
    }

    fn step_once(&mut self, world: &mut World, dt: f32) {
        // Stable view of every thermal entity.
        let snapshots: Vec<Snapshot> = world
            .query::<(&ThermalState, &Transform)>()
            .iter()
            .map(|(entity, (t, tf))| Snapshot {
                entity,
                position: tf.position,
                temperature_k: t.temperature_k,
                conductivity: t.conductivity,
                emissivity: t.emissivity,
                surface_area_m2: t.surface_area_m2,
            })
            .collect();
        if snapshots.is_empty() {
            return;
        }

        self.grid
            .build(snapshots.iter().map(|s| (s.entity, s.position)));
        let by_entity: HashMap<Entity, usize> = snapshots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.entity, i))
            .collect();

        let cfg = &self.config;
        let grid = &self.grid;
        let query_range = cfg.conduction_range_m.max(cfg.radiation_range_m);

        // Heat gather: each entity sums inbound energy from its neighbors
        // plus ambient convection. Pairs are evaluated from both sides with
        // equal magnitude, so the exchange is antisymmetric.
        let deltas: Vec<f32> = snapshots
            .par_iter()
            .map(|snap| {
                let mut joules = 0.0_f32;
                let neighbors =
                    grid.neighbors(snap.position, query_range, snap.entity, cfg.max_neighbors);
                for (other, other_pos) in neighbors {
                    let Some(&j) = by_entity.get(&other) else {
                        continue;
                    };
                    let o = &snapshots[j];
                    let d = snap.position.distance(other_pos).max(0.01);
                    let dt_temp = o.temperature_k - snap.temperature_k;

                    // Fourier conduction with harmonic-mean conductivity and
                    // the shared contact-area estimate.
                    if d <= cfg.conduction_range_m {
                        let k_sum = snap.conductivity + o.conductivity;
                        if k_sum > 0.0 {
                            let k_h = 2.0 * snap.conductivity * o.conductivity / k_sum;
                            joules += k_h * CONTACT_AREA_M2 * dt_temp / d * dt;
                        }
                    }

                    // Stefan–Boltzmann radiation with an inverse-square view
                    // factor approximation and averaged emissivity.
                    if d <= cfg.radiation_range_m {
                        let emissivity = 0.5 * (snap.emissivity + o.emissivity);
                        let view = 1.0 / (1.0 + d * d);
                        let t4 = o.temperature_k.powi(4) - snap.temperature_k.powi(4);
                        joules +=
                            STEFAN_BOLTZMANN * emissivity * snap.surface_area_m2 * view * t4 * dt;
                    }
                }

                // Newton's law of cooling against ambient air.
                joules += cfg.convection_coeff
                    * snap.surface_area_m2
                    * (cfg.ambient_k - snap.temperature_k)
                    * dt;
                joules
            })
            .collect();

        // Apply deltas, phase transitions, and the clamp.
        for (snap, &joules) in snapshots.iter().zip(&deltas) {
            let Ok(mut state) = world.get::<&mut ThermalState>(snap.entity) else {
                continue;
            };
            state.add_heat(joules);
            apply_phase_transition(&mut state, self.config.hysteresis_k);
            if state.clamp_temperature() && self.clamp_logged.insert(snap.entity) {
                log::warn!(
                    "thermal: clamped runaway temperature on {:?}",
                    snap.entity
                );
            }
        }

        self.ignite_ready_entities(world);
        self.burn_fuel(world, dt);
        self.apply_anatomy_damage(world, dt);
    }

    /// Attach combustion to combustible entities at or above their ignition
    /// point. Never replaces an existing record.
    fn ignite_ready_entities(&mut self, world: &mut World) {
        let mut to_ignite: Vec<(Entity, f32)> = Vec::new();
        for (entity, (thermal, chem)) in world
            .query::<(&ThermalState, &ChemicalComposition)>()
            .without::<&Combustion>()
            .iter()
        {
            if chem.combustible && thermal.temperature_k >= thermal.ignition_k {
                to_ignite.push((entity, thermal.mass_kg));
            }
        }
        for (entity, fuel) in to_ignite {
            log::info!("thermal: {:?} auto-ignited with {:.2} kg fuel", entity, fuel);
            let _ = world.insert_one(entity, Combustion::for_fuel(fuel));
        }
    }

    /// Consume fuel (oxygen-limited), release heat, accrue effluents, and
    /// detach fires that have burned out.
    fn burn_fuel(&mut self, world: &mut World, dt: f32) {
        let oxygen_density = self.config.ambient_oxygen_mol_m3;
        let mut burned_out: Vec<Entity> = Vec::new();

        for (entity, (thermal, chem, fire)) in world
            .query_mut::<(&mut ThermalState, &ChemicalComposition, &mut Combustion)>()
        {
            if !fire.active {
                continue;
            }
            // Oxygen available inside the flame envelope this step.
            let envelope_m3 =
                4.0 / 3.0 * std::f32::consts::PI * fire.ignition_radius_m.powi(3);
            let oxygen_mol = oxygen_density * envelope_m3 * dt;
            let fuel_by_oxygen = if chem.oxygen_demand_mol_per_kg > 0.0 {
                oxygen_mol / chem.oxygen_demand_mol_per_kg
            } else {
                f32::INFINITY
            };
            let burned = (fire.consumption_rate * dt)
                .min(fire.fuel_remaining_kg)
                .min(fuel_by_oxygen);
            fire.fuel_remaining_kg -= burned;

            let released = burned * chem.heat_of_combustion * (1.0 - chem.soot_fraction);
            thermal.add_heat(released);
            thermal.clamp_temperature();

            fire.smoke_pending += fire.smoke_spawn_rate * dt;
            fire.ember_pending += fire.ember_spawn_rate * dt;

            if fire.fuel_remaining_kg <= 0.0 {
                burned_out.push(entity);
            }
        }

        for entity in burned_out {
            log::info!("thermal: fire on {:?} burned out", entity);
            let _ = world.remove_one::<Combustion>(entity);
        }
    }

    /// Thermal damage to anatomical entities above the burn threshold.
    fn apply_anatomy_damage(&mut self, world: &mut World, dt: f32) {
        let threshold = self.config.burn_threshold_k;
        let rate = self.config.burn_damage_rate;
        for (_, (thermal, health, _)) in
            world.query_mut::<(&ThermalState, &mut Health, &Anatomy)>()
        {
            if thermal.temperature_k > threshold {
                health.take_damage((thermal.temperature_k - threshold) * rate * dt);
            }
        }
    }

    /// Probabilistic fire spread on the slow cadence: each fire rolls once
    /// per combustible neighbor inside its ignition radius. The line-of-sight
    /// flag is accepted but not evaluated.
    fn spread_fire(&mut self, world: &mut World) {
        let fires: Vec<(Entity, Vec3, f32)> = world
            .query::<(&Combustion, &Transform)>()
            .iter()
            .filter(|(_, (fire, _))| fire.active)
            .map(|(e, (fire, tf))| (e, tf.position, fire.ignition_radius_m))
            .collect();
        if fires.is_empty() {
            return;
        }

        let mut to_ignite: Vec<(Entity, f32)> = Vec::new();
        for (entity, (thermal, chem, tf)) in world
            .query::<(&ThermalState, &ChemicalComposition, &Transform)>()
            .without::<&Combustion>()
            .iter()
        {
            if !chem.combustible {
                continue;
            }
            let exposed = fires
                .iter()
                .any(|(f, pos, radius)| *f != entity && tf.position.distance(*pos) <= *radius);
            if !exposed {
                continue;
            }
            let probability = (chem.flammability * self.config.spread_interval_s).min(1.0);
            if self.rng.gen::<f32>() < probability {
                to_ignite.push((entity, thermal.mass_kg));
            }
        }

        for (entity, fuel) in to_ignite {
            log::info!("thermal: fire spread to {:?}", entity);
            let _ = world.insert_one(entity, Combustion::for_fuel(fuel));
        }
    }
}

/// Phase transitions with hysteresis. Latent heat is exchanged exactly once
/// per transition as an immediate temperature offset.
fn apply_phase_transition(state: &mut ThermalState, hysteresis: f32) {
    let specific_heat = state.specific_heat.max(1e-6);
    match state.phase {
        Phase::Solid => {
            if state.temperature_k > state.melting_k + hysteresis {
                state.phase = Phase::Liquid;
                state.temperature_k -= state.latent_heat_fusion / specific_heat;
            }
        }
        Phase::Liquid => {
            if state.temperature_k > state.boiling_k + hysteresis {
                state.phase = Phase::Gas;
                state.temperature_k -= state.latent_heat_vaporization / specific_heat;
            } else if state.temperature_k < state.melting_k - hysteresis {
                state.phase = Phase::Solid;
                state.temperature_k += state.latent_heat_fusion / specific_heat;
            }
        }
        Phase::Gas => {
            if state.temperature_k < state.boiling_k - hysteresis {
                state.phase = Phase::Liquid;
                state.temperature_k += state.latent_heat_vaporization / specific_heat;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> ThermalConfig {
        ThermalConfig {
            convection_coeff: 0.0,
            ..ThermalConfig::default()
        }
    }

    fn spawn_thermal(world: &mut World, state: ThermalState, pos: Vec3) -> Entity {
        world.spawn((state, Transform::from_position(pos)))
    }

    /// Heat flows from hot to cold through conduction until the gap narrows.
    #[test]
    fn conduction_moves_heat_toward_equilibrium() {
        let mut world = World::new();
        let mut sim = ThermalSimulator::new(quiet_config());

        let mut hot = ThermalState::steel(1.0, 0.0);
        hot.temperature_k = 800.0;
        hot.emissivity = 0.0;
        let mut cold = ThermalState::steel(1.0, 0.0);
        cold.emissivity = 0.0;

        let a = spawn_thermal(&mut world, hot, Vec3::ZERO);
        let b = spawn_thermal(&mut world, cold, Vec3::new(0.5, 0.0, 0.0));

        sim.update(&mut world, 2.0);

        let ta = world.get::<&ThermalState>(a).unwrap().temperature_k;
        let tb = world.get::<&ThermalState>(b).unwrap().temperature_k;
        assert!(ta < 800.0, "hot body cooled: {ta}");
        assert!(tb > 293.15, "cold body warmed: {tb}");
        assert!(ta > tb, "gradient not inverted");
    }

    /// A hot radiator ignites a wooden beam; the combustion record appears
    /// exactly once and fuel decreases monotonically.
    #[test]
    fn radiant_source_ignites_wood_once() {
        let mut world = World::new();
        let mut sim = ThermalSimulator::new(quiet_config());

        let mut source = ThermalState::steel(500.0, 4.0);
        source.temperature_k = 2_000.0;
        source.emissivity = 0.9;
        spawn_thermal(&mut world, source, Vec3::ZERO);

        let beam = ThermalState::wood(10.0, 1.5);
        let beam_entity = world.spawn((
            beam,
            ChemicalComposition::wood(),
            Transform::from_position(Vec3::new(0.5, 0.0, 0.0)),
        ));

        let mut ignition_frame = None;
        for frame in 0..300 {
            sim.update(&mut world, 1.0 / 30.0);
            if ignition_frame.is_none() && world.get::<&Combustion>(beam_entity).is_ok() {
                ignition_frame = Some(frame);
            }
        }
        let ignited_at = ignition_frame.expect("beam ignites within simulated 10 s");

        // Fuel only goes down from here.
        let mut last_fuel = world
            .get::<&Combustion>(beam_entity)
            .unwrap()
            .fuel_remaining_kg;
        assert!(last_fuel <= 10.0);
        for _ in 0..30 {
            sim.update(&mut world, 1.0 / 30.0);
            let fuel = world
                .get::<&Combustion>(beam_entity)
                .unwrap()
                .fuel_remaining_kg;
            assert!(fuel <= last_fuel, "fuel must decrease monotonically");
            last_fuel = fuel;
        }
        assert!(ignited_at < 300);
    }

    /// A nearly spent fire burns out and the combustion record is removed.
    #[test]
    fn exhausted_fire_detaches_combustion() {
        let mut world = World::new();
        let mut sim = ThermalSimulator::new(quiet_config());

        let beam = ThermalState::wood(10.0, 1.0);
        let mut fire = Combustion::for_fuel(10.0);
        fire.fuel_remaining_kg = 0.05;
        let entity = world.spawn((
            beam,
            ChemicalComposition::wood(),
            fire,
            Transform::from_position(Vec3::ZERO),
        ));

        for _ in 0..(30 * 60) {
            sim.update(&mut world, 1.0 / 30.0);
            if world.get::<&Combustion>(entity).is_err() {
                return;
            }
        }
        panic!("combustion should detach once fuel reaches zero");
    }

    /// Latent heat is exchanged exactly once on melt, and hysteresis stops
    /// flapping at the melting point.
    #[test]
    fn melting_consumes_latent_heat_with_hysteresis() {
        let mut state = ThermalState::new(1.0, 1.0, 1_000.0, 1.0);
        state.melting_k = 300.0;
        state.latent_heat_fusion = 10_000.0;

        // Inside the hysteresis band nothing happens.
        state.temperature_k = 303.0;
        apply_phase_transition(&mut state, 5.0);
        assert_eq!(state.phase, Phase::Solid);

        // Past the band: melts and drops by L/c = 10 K.
        state.temperature_k = 306.0;
        apply_phase_transition(&mut state, 5.0);
        assert_eq!(state.phase, Phase::Liquid);
        assert!((state.temperature_k - 296.0).abs() < 1e-3);

        // The post-melt temperature sits inside the band, so no refreeze.
        apply_phase_transition(&mut state, 5.0);
        assert_eq!(state.phase, Phase::Liquid);
    }

    /// Temperatures stay inside [1, 10000] K under absurd heat input.
    #[test]
    fn temperature_clamped_to_legal_range() {
        let mut world = World::new();
        let mut sim = ThermalSimulator::new(quiet_config());
        let mut state = ThermalState::steel(0.001, 1.0);
        state.temperature_k = 9_999.0;
        let e = spawn_thermal(&mut world, state, Vec3::ZERO);
        let mut hot = ThermalState::steel(1_000.0, 10.0);
        hot.temperature_k = 10_000.0;
        spawn_thermal(&mut world, hot, Vec3::new(0.2, 0.0, 0.0));

        sim.update(&mut world, 1.0);
        let t = world.get::<&ThermalState>(e).unwrap().temperature_k;
        assert!((crate::MIN_TEMPERATURE_K..=crate::MAX_TEMPERATURE_K).contains(&t));
    }

    /// Anatomy entities above the burn threshold lose health.
    #[test]
    fn burn_threshold_damages_anatomy_only() {
        let mut world = World::new();
        let mut sim = ThermalSimulator::new(quiet_config());

        let mut hot = ThermalState::new(70.0, 1.8, 3_500.0, 0.5);
        hot.temperature_k = 400.0;
        hot.emissivity = 0.0;
        let burned = world.spawn((
            hot.clone(),
            Health::new(100.0),
            Anatomy,
            Transform::from_position(Vec3::ZERO),
        ));
        let crate_entity = world.spawn((
            hot,
            Health::new(100.0),
            Transform::from_position(Vec3::new(50.0, 0.0, 0.0)),
        ));

        sim.update(&mut world, 1.0);
        assert!(world.get::<&Health>(burned).unwrap().current < 100.0);
        assert_eq!(world.get::<&Health>(crate_entity).unwrap().current, 100.0);
    }
}
