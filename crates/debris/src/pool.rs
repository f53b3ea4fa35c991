//! The debris pool: ownership, budgets, expiry, merging, LOD, instancing.

use crate::piece::DebrisPiece;
use glam::{IVec3, Vec3};
use meshes::MeshData;
use std::collections::HashMap;

/// Pool tuning.
#[derive(Debug, Clone)]
pub struct DebrisPoolConfig {
    pub max_entities: usize,
    pub max_total_triangles: usize,
    pub lifetime_s: f32,
    /// Pieces closer than this merge during crowding.
    pub merge_distance_m: f32,
    pub enable_lod: bool,
    pub lod_near_m: f32,
    pub lod_far_m: f32,
    /// Triangle share kept beyond `lod_far_m`.
    pub lod_reduction_far: f32,
}

impl Default for DebrisPoolConfig {
    fn default() -> Self {
        Self {
            max_entities: 500,
            max_total_triangles: 50_000,
            lifetime_s: 30.0,
            merge_distance_m: 0.5,
            enable_lod: true,
            lod_near_m: 20.0,
            lod_far_m: 50.0,
            lod_reduction_far: 0.25,
        }
    }
}

/// Rendering detail tier by viewer distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebrisLod {
    Full,
    Half,
    Far,
}

impl DebrisLod {
    /// Triangle multiplier for the tier.
    pub fn triangle_share(self, far_reduction: f32) -> f32 {
        match self {
            DebrisLod::Full => 1.0,
            DebrisLod::Half => 0.5,
            DebrisLod::Far => far_reduction,
        }
    }
}

/// Owns every live debris piece. Insertion never blocks: budget overflow
/// evicts the oldest pieces until the newcomer fits.
pub struct DebrisPool {
    config: DebrisPoolConfig,
    pieces: Vec<DebrisPiece>,
    total_triangles: usize,
    evicted_total: u64,
    merged_total: u64,
}

impl DebrisPool {
    pub fn new(config: DebrisPoolConfig) -> Self {
        Self {
            config,
            pieces: Vec::new(),
            total_triangles: 0,
            evicted_total: 0,
            merged_total: 0,
        }
    }

    pub fn config(&self) -> &DebrisPoolConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn total_triangles(&self) -> usize {
        self.total_triangles
    }

    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    pub fn merged_total(&self) -> u64 {
        self.merged_total
    }

    pub fn pieces(&self) -> &[DebrisPiece] {
        &self.pieces
    }

    pub fn pieces_mut(&mut self) -> &mut [DebrisPiece] {
        &mut self.pieces
    }

    /// Insert a piece, evicting oldest pieces first if either budget would
    /// overflow. Never fails.
    pub fn insert(&mut self, piece: DebrisPiece) {
        while !self.pieces.is_empty()
            && (self.pieces.len() + 1 > self.config.max_entities
                || self.total_triangles + piece.triangle_count > self.config.max_total_triangles)
        {
            self.evict_oldest();
        }
        self.total_triangles += piece.triangle_count;
        self.pieces.push(piece);
    }

    fn evict_oldest(&mut self) {
        let Some(oldest) = self
            .pieces
            .iter()
            .enumerate()
            .max_by(|a, b| {
                a.1.time_since_creation
                    .partial_cmp(&b.1.time_since_creation)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
        else {
            return;
        };
        let removed = self.pieces.swap_remove(oldest);
        self.total_triangles -= removed.triangle_count;
        self.evicted_total += 1;
        log::debug!(
            "debris pool: evicted piece aged {:.1}s ({} tris)",
            removed.time_since_creation,
            removed.triangle_count
        );
    }

    /// Per-frame pool maintenance: age and expire pieces, then merge when
    /// crowded past 80% of the entity budget.
    pub fn update(&mut self, dt: f32) {
        for piece in &mut self.pieces {
            piece.time_since_creation += dt;
        }
        let lifetime = self.config.lifetime_s;
        let mut freed = 0usize;
        self.pieces.retain(|p| {
            if p.time_since_creation > lifetime {
                freed += p.triangle_count;
                false
            } else {
                true
            }
        });
        self.total_triangles -= freed;

        if self.pieces.len() > self.config.max_entities * 4 / 5 {
            self.merge_close_pieces();
        }
    }

    /// Collapse clusters of nearby pieces into single larger bodies. Uses a
    /// spatial hash with merge-distance cells; each piece merges at most once
    /// per call.
    fn merge_close_pieces(&mut self) {
        let cell_size = self.config.merge_distance_m.max(1e-3);
        let mut cells: HashMap<IVec3, Vec<usize>> = HashMap::new();
        for (i, piece) in self.pieces.iter().enumerate() {
            let c = (piece.position / cell_size).floor();
            cells
                .entry(IVec3::new(c.x as i32, c.y as i32, c.z as i32))
                .or_default()
                .push(i);
        }

        let merge_dist = self.config.merge_distance_m;
        let mut merged_into: Vec<Option<usize>> = vec![None; self.pieces.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for indices in cells.values() {
            for (pos, &i) in indices.iter().enumerate() {
                if merged_into[i].is_some() {
                    continue;
                }
                let mut group = vec![i];
                for &j in &indices[pos + 1..] {
                    if merged_into[j].is_some() {
                        continue;
                    }
                    if self.pieces[i].position.distance(self.pieces[j].position) <= merge_dist {
                        group.push(j);
                    }
                }
                if group.len() > 1 {
                    let group_id = groups.len();
                    for &m in &group {
                        merged_into[m] = Some(group_id);
                    }
                    groups.push(group);
                }
            }
        }
        if groups.is_empty() {
            return;
        }

        let mut replacements: Vec<DebrisPiece> = Vec::with_capacity(groups.len());
        let mut doomed: Vec<usize> = Vec::new();
        for group in &groups {
            replacements.push(self.merge_group(group));
            doomed.extend_from_slice(group);
        }

        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for index in doomed {
            let removed = self.pieces.swap_remove(index);
            self.total_triangles -= removed.triangle_count;
        }
        for replacement in replacements {
            self.merged_total += 1;
            self.insert(replacement);
        }
    }

    /// One merged piece: summed mass, momentum-conserving velocity, and a
    /// combined hull approximated by the union of the members' world bounds.
    fn merge_group(&self, group: &[usize]) -> DebrisPiece {
        let mut bounds = self.pieces[group[0]].world_aabb();
        let mut mass = 0.0_f32;
        let mut momentum = Vec3::ZERO;
        let mut oldest = 0.0_f32;
        for &i in group {
            let p = &self.pieces[i];
            bounds = bounds.union(&p.world_aabb());
            mass += p.mass_kg;
            momentum += p.linear_velocity * p.mass_kg;
            oldest = oldest.max(p.time_since_creation);
        }
        let size = bounds.size().max(Vec3::splat(1e-3));
        let volume = size.x * size.y * size.z;
        let density = mass / volume.max(1e-6);

        let mut merged =
            DebrisPiece::from_geometry(MeshData::cuboid(size), density, bounds.center());
        merged.linear_velocity = momentum / mass.max(1e-6);
        merged.time_since_creation = oldest;
        merged
    }

    /// Detail tier for one piece relative to the viewer.
    pub fn lod_of(&self, piece: &DebrisPiece, viewer: Vec3) -> DebrisLod {
        if !self.config.enable_lod {
            return DebrisLod::Full;
        }
        let d = piece.position.distance(viewer);
        if d < self.config.lod_near_m {
            DebrisLod::Full
        } else if d < self.config.lod_far_m {
            DebrisLod::Half
        } else {
            DebrisLod::Far
        }
    }

    /// Group piece indices by geometry hash; groups of more than one piece
    /// render as instances of a shared mesh.
    pub fn instance_groups(&self) -> HashMap<u64, Vec<usize>> {
        let mut groups: HashMap<u64, Vec<usize>> = HashMap::new();
        for (i, piece) in self.pieces.iter().enumerate() {
            groups.entry(piece.geometry_hash).or_default().push(i);
        }
        groups
    }

    /// Budget invariant: entity count and live triangle total both within
    /// configured limits and internally consistent.
    pub fn check_budgets(&self) -> bool {
        let tris: usize = self.pieces.iter().map(|p| p.triangle_count).sum();
        tris == self.total_triangles
            && self.pieces.len() <= self.config.max_entities
            && tris <= self.config.max_total_triangles
    }
}
