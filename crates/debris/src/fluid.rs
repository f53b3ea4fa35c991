//! Fluid-debris coupling.
//!
//! The fluid grid is supplied externally each frame; debris samples it
//! through its 4³ voxel approximation and receives buoyancy, drag, angular
//! drag, and flow forces. Sleeping pieces are woken by significant net force.

use crate::piece::{DebrisPiece, VOXEL_GRID_DIM};
use glam::{IVec3, Vec3};

/// Cell classification of the staggered fluid grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FluidCellKind {
    #[default]
    Air,
    Liquid,
    Gas,
}

/// One sampled fluid cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct FluidCell {
    pub kind: FluidCellKind,
    /// Fluid density [kg/m³]; 0 for air.
    pub density: f32,
    pub velocity: Vec3,
}

impl FluidCell {
    pub const AIR: FluidCell = FluidCell {
        kind: FluidCellKind::Air,
        density: 0.0,
        velocity: Vec3::ZERO,
    };
}

/// Read-only fluid sampling contract. Sampling outside the grid returns Air.
pub trait FluidGrid {
    fn sample(&self, world_pos: Vec3) -> FluidCell;
}

/// Dense uniform grid provider: origin, cell size, dimensions, cells.
pub struct UniformFluidGrid {
    pub origin: Vec3,
    pub cell_size: f32,
    pub dims: IVec3,
    cells: Vec<FluidCell>,
}

impl UniformFluidGrid {
    pub fn new(origin: Vec3, cell_size: f32, dims: IVec3) -> Self {
        let len = (dims.x * dims.y * dims.z).max(0) as usize;
        Self {
            origin,
            cell_size,
            dims,
            cells: vec![FluidCell::AIR; len],
        }
    }

    /// Fill a world-space axis-aligned region with liquid at `density`.
    pub fn fill_liquid(&mut self, min: Vec3, max: Vec3, density: f32, velocity: Vec3) {
        for z in 0..self.dims.z {
            for y in 0..self.dims.y {
                for x in 0..self.dims.x {
                    let center = self.origin
                        + Vec3::new(
                            (x as f32 + 0.5) * self.cell_size,
                            (y as f32 + 0.5) * self.cell_size,
                            (z as f32 + 0.5) * self.cell_size,
                        );
                    if center.cmpge(min).all() && center.cmple(max).all() {
                        let i = self.index(x, y, z);
                        self.cells[i] = FluidCell {
                            kind: FluidCellKind::Liquid,
                            density,
                            velocity,
                        };
                    }
                }
            }
        }
    }

    fn index(&self, x: i32, y: i32, z: i32) -> usize {
        (x + self.dims.x * (y + self.dims.y * z)) as usize
    }
}

impl FluidGrid for UniformFluidGrid {
    fn sample(&self, world_pos: Vec3) -> FluidCell {
        let rel = (world_pos - self.origin) / self.cell_size;
        let cell = IVec3::new(
            rel.x.floor() as i32,
            rel.y.floor() as i32,
            rel.z.floor() as i32,
        );
        if cell.cmplt(IVec3::ZERO).any() || cell.cmpge(self.dims).any() {
            return FluidCell::AIR;
        }
        self.cells[self.index(cell.x, cell.y, cell.z)]
    }
}

/// Coupling tuning.
#[derive(Debug, Clone)]
pub struct FluidCouplingConfig {
    /// A voxel sample counts as submerged at or above this fluid density.
    pub submersion_density_threshold: f32,
    /// Drag coefficient C_d.
    pub drag_coefficient: f32,
    /// Angular drag torque coefficient.
    pub angular_drag: f32,
    /// Scale on the flow force (average fluid velocity × mass).
    pub flow_strength: f32,
    /// Net force that wakes a sleeping piece [N].
    pub wake_force_n: f32,
    /// At most this many pieces are coupled per frame.
    pub max_coupled_pieces: usize,
    pub gravity: f32,
}

impl Default for FluidCouplingConfig {
    fn default() -> Self {
        Self {
            submersion_density_threshold: 0.5,
            drag_coefficient: 0.8,
            angular_drag: 0.5,
            flow_strength: 0.15,
            wake_force_n: 1.0,
            max_coupled_pieces: 256,
            gravity: 9.81,
        }
    }
}

/// Applies fluid forces to debris.
pub struct FluidCoupling {
    config: FluidCouplingConfig,
}

impl FluidCoupling {
    pub fn new(config: FluidCouplingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FluidCouplingConfig {
        &self.config
    }

    /// Fraction of the piece's occupied voxels whose world-space samples read
    /// as fluid. Exactly threshold density counts as submerged.
    pub fn submerged_fraction(&self, piece: &DebrisPiece, grid: &dyn FluidGrid) -> (f32, Vec3, f32) {
        let mut submerged = 0u32;
        let mut flow_sum = Vec3::ZERO;
        let mut density_sum = 0.0_f32;
        let occupied = piece.voxel_approximation.occupied_count().max(1);
        for z in 0..VOXEL_GRID_DIM {
            for y in 0..VOXEL_GRID_DIM {
                for x in 0..VOXEL_GRID_DIM {
                    if !piece.voxel_approximation.occupied(x, y, z) {
                        continue;
                    }
                    let sample = grid.sample(piece.voxel_world_center(x, y, z));
                    if sample.density >= self.config.submersion_density_threshold {
                        submerged += 1;
                        flow_sum += sample.velocity;
                        density_sum += sample.density;
                    }
                }
            }
        }
        if submerged == 0 {
            return (0.0, Vec3::ZERO, 0.0);
        }
        (
            submerged as f32 / occupied as f32,
            flow_sum / submerged as f32,
            density_sum / submerged as f32,
        )
    }

    /// Couple every eligible piece to the grid for one frame of `dt`.
    /// Non-sleeping pieces within the budget receive forces; sleeping pieces
    /// are only probed and woken when the net force is significant.
    pub fn apply(&self, pieces: &mut [DebrisPiece], grid: &dyn FluidGrid, dt: f32) {
        let cfg = &self.config;
        for piece in pieces.iter_mut().take(cfg.max_coupled_pieces) {
            let (fraction, flow_velocity, fluid_density) = self.submerged_fraction(piece, grid);
            if fraction <= 0.0 {
                continue;
            }

            let volume = piece.local_aabb.volume();
            let submerged_volume = volume * fraction;

            // Buoyancy: ρ_fluid · V_submerged · g, upward.
            let buoyancy = Vec3::Y * (fluid_density * submerged_volume * cfg.gravity);

            // Quadratic drag against the relative velocity, with the cross
            // section taken from the AABB face normal to the dominant axis.
            let fluid_at_center = grid.sample(piece.position);
            let v_rel = piece.linear_velocity - fluid_at_center.velocity;
            let speed = v_rel.length();
            let drag = if speed > 1e-5 {
                let size = piece.local_aabb.size();
                let abs = v_rel.abs();
                let area = if abs.x >= abs.y && abs.x >= abs.z {
                    size.y * size.z
                } else if abs.y >= abs.z {
                    size.x * size.z
                } else {
                    size.x * size.y
                };
                -v_rel / speed
                    * (0.5 * fluid_density * speed * speed * cfg.drag_coefficient * area)
            } else {
                Vec3::ZERO
            };

            // Flow push: average fluid velocity across submerged voxels.
            let flow = flow_velocity * piece.mass_kg * cfg.flow_strength;

            let net = buoyancy + drag + flow;
            if piece.is_sleeping {
                if net.length() > cfg.wake_force_n {
                    piece.wake();
                } else {
                    continue;
                }
            }

            piece.linear_velocity += net / piece.mass_kg * dt;

            // Angular drag: τ = −k·ω.
            let torque = -cfg.angular_drag * piece.angular_velocity;
            piece.angular_velocity += torque / piece.inertia.max_element().max(1e-4) * dt;
        }
    }
}
