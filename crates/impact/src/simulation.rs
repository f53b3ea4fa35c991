//! Frame orchestration: one type owning every subsystem.
//!
//! Per-frame order (leaves first): mesh loads resolve, thermal/combustion,
//! structural integrity, impact dispatch, fracture futures joined, debris
//! pool maintenance, rigid-body integration, fluid coupling. Tilemap chunk
//! rebuild flags are left for the renderer to drain afterwards.

use crate::dispatcher::{determine_approach, DispatcherConfig, FractureApproach, ImpactEvent};
use debris::{
    DebrisIntegrator, DebrisPiece, DebrisPool, DebrisPoolConfig, FluidCoupling,
    FluidCouplingConfig, FluidGrid, IntegratorConfig,
};
use engine_core::{Health, Transform};
use fracture::{
    CpuBackend, FractureBackend, FractureConfig, FractureFuture, FractureJob, ImpactKind,
};
use glam::{IVec3, Vec3};
use hecs::{Entity, World};
use meshes::{Aabb, MeshData, TileMeshCache};
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use structural::{
    ChipRequest, MaterialCatalog, MaterialEntry, StructuralBody, SurfaceDamage,
    SurfaceDamageKind, SurfaceDamageOutcome, SurfaceDecal,
};
use thermal::{Combustion, ThermalConfig, ThermalSimulator};
use tilemap::{TileInstance, TileWorld};

/// Impact contact area estimate for the structural stress pulse [m²].
const IMPACT_AREA_M2: f32 = 0.01;
/// Characteristic length for the stress pulse [m].
const CHARACTERISTIC_LENGTH_M: f32 = 0.5;

/// World-space geometry of a destructible entity.
pub struct BodyMesh {
    pub data: MeshData,
}

/// Index into the material catalog.
#[derive(Debug, Clone, Copy)]
pub struct MaterialRef(pub u32);

/// Links a destructible entity to the tile it represents; full fracture
/// removes the tile.
#[derive(Debug, Clone, Copy)]
pub struct TileBody {
    pub coord: IVec3,
}

/// Per-frame counters, refreshed at the end of each update.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub impacts_processed: u32,
    pub pieces_spawned: u32,
    pub chips_spawned: u32,
    pub decals_recorded: u32,
    pub entities_destroyed: u32,
    pub active_fires: u32,
    pub awake_pieces: u32,
}

struct PendingFracture {
    target: Entity,
    approach: FractureApproach,
    tile: Option<IVec3>,
    job: FractureJob,
    future: FractureFuture,
}

/// The destruction simulation core.
pub struct Simulation {
    pub world: World,
    pub tiles: TileWorld,
    materials: MaterialCatalog,
    mesh_cache: Option<Arc<TileMeshCache>>,
    thermal: ThermalSimulator,
    pool: DebrisPool,
    integrator: DebrisIntegrator,
    fluid: FluidCoupling,
    dispatcher: DispatcherConfig,
    cpu_backend: CpuBackend,
    gpu_backend: Option<Box<dyn FractureBackend>>,
    pending_impacts: Vec<ImpactEvent>,
    pending_fractures: Vec<PendingFracture>,
    pending_mesh_loads: Vec<PathBuf>,
    decals: VecDeque<SurfaceDecal>,
    fracture_seed_counter: u64,
    stats: FrameStats,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            tiles: TileWorld::new(),
            materials: MaterialCatalog::standard(),
            mesh_cache: None,
            thermal: ThermalSimulator::new(ThermalConfig::default()),
            pool: DebrisPool::new(DebrisPoolConfig::default()),
            integrator: DebrisIntegrator::new(IntegratorConfig::default()),
            fluid: FluidCoupling::new(FluidCouplingConfig::default()),
            dispatcher: DispatcherConfig::default(),
            cpu_backend: CpuBackend::new(),
            gpu_backend: None,
            pending_impacts: Vec::new(),
            pending_fractures: Vec::new(),
            pending_mesh_loads: Vec::new(),
            decals: VecDeque::new(),
            fracture_seed_counter: 0,
            stats: FrameStats::default(),
        }
    }

    /// Attach the shared mesh cache; queued mesh loads resolve through it at
    /// the top of each frame.
    pub fn with_mesh_cache(mut self, cache: Arc<TileMeshCache>) -> Self {
        self.mesh_cache = Some(cache);
        self
    }

    /// Attach a GPU fracture backend. Failures fall back to the CPU path.
    pub fn with_gpu_backend(mut self, backend: Box<dyn FractureBackend>) -> Self {
        self.gpu_backend = Some(backend);
        self
    }

    pub fn with_materials(mut self, materials: MaterialCatalog) -> Self {
        self.materials = materials;
        self
    }

    pub fn pool(&self) -> &DebrisPool {
        &self.pool
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn decals(&self) -> impl Iterator<Item = &SurfaceDecal> {
        self.decals.iter()
    }

    pub fn materials(&self) -> &MaterialCatalog {
        &self.materials
    }

    /// Queue an impact for the next frame's dispatch phase.
    pub fn on_impact(&mut self, event: ImpactEvent) {
        self.pending_impacts.push(event);
    }

    /// Queue a mesh path to resolve through the cache at the next frame top.
    pub fn queue_mesh_load(&mut self, path: PathBuf) {
        self.pending_mesh_loads.push(path);
    }

    /// Place a tile and spawn its destructible body entity: world geometry,
    /// material, surface damage state, and a load-bearing column with a
    /// critical base edge.
    pub fn spawn_tile_body(
        &mut self,
        definition_id: u32,
        coord: IVec3,
    ) -> anyhow::Result<Entity> {
        let def = self
            .tiles
            .definition(definition_id)
            .ok_or_else(|| anyhow::anyhow!("unknown tile definition {definition_id}"))?;
        let material_id = def.material_id;
        let height = def.height_meters.max(0.1);
        let mesh_path = def.mesh_path.clone();
        self.tiles.insert_tile(TileInstance::new(definition_id, coord))?;
        if self.mesh_cache.is_some() {
            self.queue_mesh_load(PathBuf::from(mesh_path));
        }

        let center = self.tiles.tile_to_world(coord);
        let entry = self.materials.get_or_default(material_id);
        let size = Vec3::new(1.0, height, 1.0);
        let mass = size.x * size.y * size.z * entry.structural.density;

        let mut mesh = MeshData::cuboid(size);
        for v in &mut mesh.vertices {
            v.position = (Vec3::from(v.position) + center).into();
        }

        let column = StructuralBody::column(center - Vec3::new(0.0, height * 0.5, 0.0), height, 3, mass);
        let entity = self.world.spawn((
            Transform::from_position(center),
            BodyMesh { data: mesh },
            MaterialRef(material_id),
            SurfaceDamage::default(),
            TileBody { coord },
            column,
        ));
        Ok(entity)
    }

    /// Advance one frame. `fluid` is this frame's externally supplied grid,
    /// if any.
    pub fn update(&mut self, dt: f32, fluid: Option<&dyn FluidGrid>) {
        self.stats = FrameStats::default();

        // 1. Mesh cache resolves deferred loads.
        self.resolve_mesh_loads();

        // 2. Thermal & combustion (fixed-rate accumulator inside).
        self.thermal.update(&mut self.world, dt);

        // 3. Structural integrity.
        self.structural_tick();

        // 4. Impact dispatcher drains its queue; fracture jobs submitted.
        let impacts = std::mem::take(&mut self.pending_impacts);
        for event in impacts {
            self.dispatch_impact(event);
        }

        // 5. Fracture results awaited before the pool phase.
        self.resolve_pending_fractures();

        // 6. Debris pool expiry, merge, budgets.
        self.pool.update(dt);

        // 7. Rigid-body integration + collision iterations.
        self.integrator.update(self.pool.pieces_mut(), dt);

        // 8. Fluid-debris coupling.
        if let Some(grid) = fluid {
            self.fluid.apply(self.pool.pieces_mut(), grid, dt);
        }

        // 9. Chunk rebuild flags stay set on the tile world for the renderer.
        self.stats.active_fires = self.world.query::<&Combustion>().iter().count() as u32;
        self.stats.awake_pieces = self
            .pool
            .pieces()
            .iter()
            .filter(|p| !p.is_sleeping)
            .count() as u32;
        log::debug!(
            "frame: {} impacts, {} pieces spawned, {} fires, {} awake",
            self.stats.impacts_processed,
            self.stats.pieces_spawned,
            self.stats.active_fires,
            self.stats.awake_pieces
        );
    }

    fn resolve_mesh_loads(&mut self) {
        let Some(cache) = &self.mesh_cache else {
            self.pending_mesh_loads.clear();
            return;
        };
        for path in self.pending_mesh_loads.drain(..) {
            if let Err(e) = cache.load(&path) {
                log::warn!("deferred mesh load failed for {}: {e}", path.display());
            }
        }
    }

    /// Propagate standing loads; bodies that fail under their own weight
    /// with a severed critical edge enqueue a collapse.
    fn structural_tick(&mut self) {
        let mut collapses: Vec<ImpactEvent> = Vec::new();
        for (entity, (body, material_ref)) in self
            .world
            .query_mut::<(&mut StructuralBody, &MaterialRef)>()
        {
            body.propagate_loads();
            let entry = self.materials.get_or_default(material_ref.0);
            let report = body.check_failure(&entry.structural);
            if report.severed_critical_edge {
                let centroid = body
                    .vertices
                    .iter()
                    .map(|v| v.position)
                    .sum::<Vec3>()
                    / body.vertices.len().max(1) as f32;
                let scale = entry.structural.fracture_toughness
                    * self.dispatcher.toughness_gate_factor;
                collapses.push(ImpactEvent {
                    target: entity,
                    point: centroid,
                    direction: -Vec3::Y,
                    energy_j: self.dispatcher.partial_fracture_max_j * scale * 1.5,
                    kind: ImpactKind::Crushing,
                });
                log::info!("structural collapse queued for {:?}", entity);
            } else if report.any_failed() {
                log::debug!(
                    "static overstress on {:?}: {} vertices",
                    entity,
                    report.failed_vertices.len()
                );
            }
        }
        for event in collapses {
            let already_pending = self
                .pending_impacts
                .iter()
                .any(|e| e.target == event.target)
                || self
                    .pending_fractures
                    .iter()
                    .any(|p| p.target == event.target);
            if !already_pending {
                self.pending_impacts.push(event);
            }
        }
    }

    /// Turn one impact event into concrete mutations.
    fn dispatch_impact(&mut self, event: ImpactEvent) {
        let Ok(material_ref) = self.world.get::<&MaterialRef>(event.target).map(|m| *m)
        else {
            log::warn!("impact on {:?} without a material; dropped", event.target);
            return;
        };
        let entry = self.materials.get_or_default(material_ref.0).clone();
        let approach = determine_approach(&self.dispatcher, event.energy_j, &entry.structural);
        self.stats.impacts_processed += 1;
        log::debug!(
            "impact {:?}: {:.0} J on {} -> {:?}",
            event.target,
            event.energy_j,
            entry.name,
            approach
        );

        let damage_fraction =
            event.energy_j / 1_000.0 * entry.structural.impact_damage_factor;

        match approach {
            FractureApproach::NoFracture => {
                self.push_decal(SurfaceDecal {
                    position: event.point,
                    normal: -event.direction.normalize_or_zero(),
                    radius: SurfaceDamage::hole_radius(event.energy_j),
                    kind: SurfaceDamageKind::Scratch,
                });
                self.apply_health_damage(event.target, damage_fraction);
            }
            FractureApproach::SurfaceDamage => {
                let seed = self.next_seed();
                let outcome = match self
                    .world
                    .query_one_mut::<(&mut BodyMesh, &mut SurfaceDamage)>(event.target)
                {
                    Ok((mesh, damage)) => Some(damage.apply_projectile_hit(
                        &mut mesh.data,
                        event.point,
                        event.direction,
                        event.energy_j,
                        &entry,
                        seed,
                    )),
                    Err(_) => None,
                };
                match outcome {
                    Some(SurfaceDamageOutcome::Applied { chips, .. }) => {
                        if let Some(request) = chips {
                            self.spawn_chips(request, &entry);
                        }
                    }
                    Some(SurfaceDamageOutcome::Decal(decal)) => self.push_decal(decal),
                    None => self.push_decal(SurfaceDecal {
                        position: event.point,
                        normal: -event.direction.normalize_or_zero(),
                        radius: SurfaceDamage::hole_radius(event.energy_j),
                        kind: SurfaceDamageKind::BulletHole,
                    }),
                }
                self.apply_health_damage(event.target, damage_fraction);
            }
            FractureApproach::PartialFracture | FractureApproach::FullFracture => {
                // Fold the impact into the stress field; a severed critical
                // edge upgrades a partial fracture to a full collapse.
                let mut decided = approach;
                if let Ok(mut body) = self.world.get::<&mut StructuralBody>(event.target) {
                    body.apply_impact(
                        event.point,
                        event.direction,
                        event.energy_j,
                        IMPACT_AREA_M2,
                        CHARACTERISTIC_LENGTH_M,
                    );
                    let report = body.check_failure(&entry.structural);
                    if report.severed_critical_edge {
                        decided = FractureApproach::FullFracture;
                    }
                    body.clear_stresses();
                }

                let source = {
                    let Ok(mesh) = self.world.get::<&BodyMesh>(event.target) else {
                        log::warn!("fracture target {:?} has no geometry", event.target);
                        return;
                    };
                    match decided {
                        FractureApproach::FullFracture => mesh.data.clone(),
                        _ => {
                            let body_bb = mesh.data.aabb();
                            let half =
                                Vec3::splat(self.dispatcher.partial_region_half_extent_m);
                            let region = Aabb::new(
                                (event.point - half).max(body_bb.min),
                                (event.point + half).min(body_bb.max),
                            );
                            translated_cuboid(&region)
                        }
                    }
                };

                let tile = self
                    .world
                    .get::<&TileBody>(event.target)
                    .ok()
                    .map(|t| t.coord);
                let job = FractureJob {
                    source,
                    impact_point: event.point,
                    impact_dir: event.direction,
                    energy_j: event.energy_j,
                    kind: event.kind,
                    props: entry.fracture.clone(),
                    density: entry.structural.density,
                    config: FractureConfig {
                        seed: self.next_seed(),
                        use_gpu: self.gpu_backend.is_some(),
                        ..FractureConfig::default()
                    },
                };
                let future = match &self.gpu_backend {
                    Some(gpu) => gpu.dispatch(job.clone()),
                    None => self.cpu_backend.dispatch(job.clone()),
                };
                self.pending_fractures.push(PendingFracture {
                    target: event.target,
                    approach: decided,
                    tile,
                    job,
                    future,
                });
                if decided == FractureApproach::PartialFracture {
                    self.apply_health_damage(event.target, damage_fraction * 3.0);
                }
            }
        }
    }

    /// Join every outstanding fracture future; GPU failures retry on the CPU
    /// backend. Full fractures destroy their source entity and tile.
    fn resolve_pending_fractures(&mut self) {
        let pending = std::mem::take(&mut self.pending_fractures);
        for p in pending {
            let pieces = match pollster::block_on(p.future) {
                Ok(pieces) => pieces,
                Err(e) => {
                    log::warn!("fracture dispatch failed ({e}); falling back to CPU");
                    match pollster::block_on(self.cpu_backend.dispatch(p.job.clone())) {
                        Ok(pieces) => pieces,
                        Err(e) => {
                            log::error!("CPU fracture fallback failed: {e}");
                            continue;
                        }
                    }
                }
            };
            for piece in pieces {
                self.pool.insert(piece);
                self.stats.pieces_spawned += 1;
            }
            if p.approach == FractureApproach::FullFracture {
                if let Some(coord) = p.tile {
                    if let Err(e) = self.tiles.remove_tile(coord) {
                        log::warn!("destroyed tile {:?} was already gone: {e}", coord);
                    }
                }
                if self.world.despawn(p.target).is_ok() {
                    self.stats.entities_destroyed += 1;
                }
            }
        }
    }

    /// Chip debris around a fresh surface hole: small cuboids thrown along
    /// the surface normal with deterministic jitter.
    fn spawn_chips(&mut self, request: ChipRequest, entry: &MaterialEntry) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(request.seed);
        for _ in 0..request.count {
            let jitter = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ) * request.chip_size_m;
            let mut piece = DebrisPiece::cuboid(
                Vec3::splat(request.chip_size_m.max(0.01)),
                entry.structural.density,
                request.position + request.normal * 0.02 + jitter * 0.5,
            );
            let speed = rng.gen_range(1.5..4.0);
            piece.linear_velocity = (request.normal + jitter.normalize_or_zero() * 0.4)
                .normalize_or_zero()
                * speed;
            piece.angular_velocity = jitter.normalize_or_zero() * speed * 2.0;
            self.pool.insert(piece);
            self.stats.chips_spawned += 1;
        }
    }

    fn push_decal(&mut self, decal: SurfaceDecal) {
        if self.decals.len() >= self.dispatcher.max_decals {
            self.decals.pop_front();
        }
        self.decals.push_back(decal);
        self.stats.decals_recorded += 1;
    }

    /// Decrement the target's health: the tile's normalized health ladder
    /// and any `Health` component both advance.
    fn apply_health_damage(&mut self, target: Entity, fraction: f32) {
        let tile = self.world.get::<&TileBody>(target).ok().map(|t| t.coord);
        if let Some(coord) = tile {
            let _ = self.tiles.modify_tile(coord, |t| {
                t.apply_damage(fraction);
            });
        }
        if let Ok(mut health) = self.world.get::<&mut Health>(target) {
            let max = health.max;
            health.take_damage(fraction * max);
        }
    }

    fn next_seed(&mut self) -> u64 {
        self.fracture_seed_counter = self
            .fracture_seed_counter
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.fracture_seed_counter
    }
}

/// Cuboid mesh spanning a world-space box.
fn translated_cuboid(bb: &Aabb) -> MeshData {
    let mut mesh = MeshData::cuboid(bb.size().max(Vec3::splat(0.05)));
    let center = bb.center();
    for v in &mut mesh.vertices {
        v.position = (Vec3::from(v.position) + center).into();
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use fracture::FractureError;
    use tilemap::{TileDefinition, TileState};

    fn sim_with_materials() -> Simulation {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut sim = Simulation::new();
        let materials = sim.materials().clone();
        let concrete = materials.index_of("concrete").unwrap();
        let wood = materials.index_of("wood").unwrap();
        let brick = materials.index_of("brick").unwrap();
        sim.tiles.register_definition(
            TileDefinition::simple(1, "concrete_wall", "tiles/wall.glb").material(concrete),
        );
        sim.tiles.register_definition(
            TileDefinition::simple(2, "wood_plank", "tiles/plank.glb").material(wood),
        );
        sim.tiles.register_definition(
            TileDefinition::simple(3, "brick_wall", "tiles/brick.glb").material(brick),
        );
        sim
    }

    /// A 15 J bullet on a concrete wall: decal, health tick, no debris, no
    /// geometry change.
    #[test]
    fn low_energy_bullet_leaves_only_a_decal() {
        let mut sim = sim_with_materials();
        let coord = IVec3::new(0, 0, 0);
        let wall = sim.spawn_tile_body(1, coord).unwrap();
        let before = sim
            .world
            .get::<&BodyMesh>(wall)
            .unwrap()
            .data
            .vertices
            .clone();

        sim.on_impact(ImpactEvent {
            target: wall,
            point: sim.tiles.tile_to_world(coord) + Vec3::new(-0.5, 0.0, 0.0),
            direction: Vec3::X,
            energy_j: 15.0,
            kind: ImpactKind::PointImpact,
        });
        sim.update(1.0 / 60.0, None);

        assert_eq!(sim.decals().count(), 1);
        assert!(sim.pool().is_empty());
        let tile = sim.tiles.tile_at(coord).unwrap();
        assert!((tile.health - (1.0 - 15.0 / 1_000.0 * 1.3)).abs() < 1e-5);
        assert_eq!(tile.state, TileState::Intact);
        let after = &sim.world.get::<&BodyMesh>(wall).unwrap().data.vertices;
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.position, b.position);
        }
    }

    /// An 80 J rifle round on a wood plank: surface damage plus 3–8 splinter
    /// debris; the plank advances no further than Cracked.
    #[test]
    fn rifle_round_chews_wood_and_throws_splinters() {
        let mut sim = sim_with_materials();
        let coord = IVec3::new(0, 0, 0);
        let plank = sim.spawn_tile_body(2, coord).unwrap();

        // Strike a mesh corner so vertices fall inside the 2 cm hole.
        let corner = sim.tiles.tile_to_world(coord) + Vec3::splat(-0.5);
        sim.on_impact(ImpactEvent {
            target: plank,
            point: corner,
            direction: Vec3::Z,
            energy_j: 80.0,
            kind: ImpactKind::PointImpact,
        });
        sim.update(1.0 / 60.0, None);

        assert!(
            (3..=8).contains(&(sim.stats().chips_spawned as usize)),
            "splinters: {}",
            sim.stats().chips_spawned
        );
        assert_eq!(sim.pool().len(), sim.stats().chips_spawned as usize);
        let damage = sim.world.get::<&SurfaceDamage>(plank).unwrap();
        assert_eq!(damage.records().len(), 1);
        let tile = sim.tiles.tile_at(coord).unwrap();
        assert!(tile.state <= TileState::Cracked);
    }

    /// A 1200 J grenade on a brick wall: full fracture, 5–15 pieces, wall
    /// entity and tile destroyed.
    #[test]
    fn grenade_demolishes_brick_wall() {
        let mut sim = sim_with_materials();
        let coord = IVec3::new(2, 0, 0);
        let wall = sim.spawn_tile_body(3, coord).unwrap();
        let impact = sim.tiles.tile_to_world(coord) + Vec3::new(-0.6, 0.0, 0.0);

        sim.on_impact(ImpactEvent {
            target: wall,
            point: impact,
            direction: Vec3::X,
            energy_j: 1_200.0,
            kind: ImpactKind::Explosion,
        });
        sim.update(1.0 / 60.0, None);

        let spawned = sim.stats().pieces_spawned as usize;
        assert!((5..=15).contains(&spawned), "pieces: {spawned}");
        assert_eq!(sim.pool().len(), spawned);
        assert!(sim.tiles.tile_at(coord).is_none(), "tile removed");
        assert!(sim.world.get::<&BodyMesh>(wall).is_err(), "entity destroyed");
        assert_eq!(sim.stats().entities_destroyed, 1);
        // Pieces fly away from the impact.
        for piece in sim.pool().pieces() {
            let radial = piece.position - impact;
            if radial.length() > 1e-3 && piece.linear_velocity.length() > 1e-3 {
                assert!(piece.linear_velocity.dot(radial) > 0.0);
            }
        }
        // The chunk is flagged for rebuild after the mutation.
        assert!(!sim.tiles.dirty_chunks().is_empty());
    }

    struct FailingGpu;

    impl FractureBackend for FailingGpu {
        fn dispatch(&self, _job: FractureJob) -> FractureFuture {
            Box::pin(std::future::ready(Err(FractureError::GpuAllocationFailed)))
        }

        fn name(&self) -> &'static str {
            "failing-test-gpu"
        }
    }

    /// A failing GPU backend degrades to the CPU path for that call.
    #[test]
    fn gpu_failure_falls_back_to_cpu() {
        let mut sim = sim_with_materials().with_gpu_backend(Box::new(FailingGpu));
        let coord = IVec3::new(0, 0, 0);
        let wall = sim.spawn_tile_body(3, coord).unwrap();
        sim.on_impact(ImpactEvent {
            target: wall,
            point: sim.tiles.tile_to_world(coord),
            direction: Vec3::X,
            energy_j: 2_000.0,
            kind: ImpactKind::Explosion,
        });
        sim.update(1.0 / 60.0, None);
        assert!(sim.stats().pieces_spawned > 0, "CPU fallback produced pieces");
    }

    /// Repeated sub-threshold hits eventually exhaust the surface budget and
    /// fall back to decals.
    #[test]
    fn surface_budget_exhaustion_degrades_to_decals() {
        let mut sim = sim_with_materials();
        let coord = IVec3::new(0, 0, 0);
        let plank = sim.spawn_tile_body(2, coord).unwrap();
        {
            let mut damage = sim.world.get::<&mut SurfaceDamage>(plank).unwrap();
            *damage = SurfaceDamage::new(4);
        }
        let corner = sim.tiles.tile_to_world(coord) + Vec3::splat(-0.5);
        for _ in 0..3 {
            sim.on_impact(ImpactEvent {
                target: plank,
                point: corner,
                direction: Vec3::Z,
                energy_j: 80.0,
                kind: ImpactKind::PointImpact,
            });
            sim.update(1.0 / 60.0, None);
        }
        assert!(sim.decals().count() > 0, "exhausted budget records decals");
    }

    /// Fractured pieces then settle under integration without panicking and
    /// the budgets hold.
    #[test]
    fn post_fracture_frames_keep_budget_invariants() {
        let mut sim = sim_with_materials();
        let coord = IVec3::new(0, 0, 0);
        let wall = sim.spawn_tile_body(3, coord).unwrap();
        sim.on_impact(ImpactEvent {
            target: wall,
            point: sim.tiles.tile_to_world(coord),
            direction: Vec3::X,
            energy_j: 1_500.0,
            kind: ImpactKind::Explosion,
        });
        for _ in 0..30 {
            sim.update(1.0 / 60.0, None);
        }
        assert!(sim.pool().check_budgets());
    }
}
