//! Uniform spatial grid for neighbor queries.
//!
//! Rebuilt each thermal step from entity positions; cells are cubes of the
//! configured size (default 2 m).

use glam::{IVec3, Vec3};
use hecs::Entity;
use std::collections::HashMap;

/// Sparse cell → occupants map.
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<(Entity, Vec3)>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_of(&self, p: Vec3) -> IVec3 {
        IVec3::new(
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
            (p.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, entity: Entity, position: Vec3) {
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().push((entity, position));
    }

    /// Rebuild from scratch.
    pub fn build<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (Entity, Vec3)>,
    {
        self.clear();
        for (entity, position) in items {
            self.insert(entity, position);
        }
    }

    /// Entities within `radius` of `center`, excluding `exclude`, capped at
    /// `max_neighbors` (closest kept when over the cap).
    pub fn neighbors(
        &self,
        center: Vec3,
        radius: f32,
        exclude: Entity,
        max_neighbors: usize,
    ) -> Vec<(Entity, Vec3)> {
        let r_cells = (radius / self.cell_size).ceil() as i32;
        let center_cell = self.cell_of(center);
        let r2 = radius * radius;

        let mut found: Vec<(Entity, Vec3, f32)> = Vec::new();
        for dz in -r_cells..=r_cells {
            for dy in -r_cells..=r_cells {
                for dx in -r_cells..=r_cells {
                    let cell = center_cell + IVec3::new(dx, dy, dz);
                    let Some(occupants) = self.cells.get(&cell) else {
                        continue;
                    };
                    for &(entity, pos) in occupants {
                        if entity == exclude {
                            continue;
                        }
                        let d2 = pos.distance_squared(center);
                        if d2 <= r2 {
                            found.push((entity, pos, d2));
                        }
                    }
                }
            }
        }

        if found.len() > max_neighbors {
            found.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
            found.truncate(max_neighbors);
        }
        found.into_iter().map(|(e, p, _)| (e, p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    fn entities(n: usize) -> (World, Vec<Entity>) {
        let mut w = World::new();
        let es = (0..n).map(|_| w.spawn(())).collect();
        (w, es)
    }

    #[test]
    fn neighbors_respect_radius_and_exclusion() {
        let (_w, es) = entities(3);
        let mut grid = SpatialGrid::new(2.0);
        grid.insert(es[0], Vec3::ZERO);
        grid.insert(es[1], Vec3::new(1.0, 0.0, 0.0));
        grid.insert(es[2], Vec3::new(10.0, 0.0, 0.0));

        let near = grid.neighbors(Vec3::ZERO, 3.0, es[0], 16);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].0, es[1]);
    }

    #[test]
    fn neighbor_cap_keeps_closest() {
        let (_w, es) = entities(6);
        let mut grid = SpatialGrid::new(2.0);
        for (i, &e) in es.iter().enumerate() {
            grid.insert(e, Vec3::new(i as f32 * 0.5, 0.0, 0.0));
        }
        let near = grid.neighbors(Vec3::ZERO, 10.0, es[0], 2);
        assert_eq!(near.len(), 2);
        assert_eq!(near[0].0, es[1]);
        assert_eq!(near[1].0, es[2]);
    }

    #[test]
    fn cells_handle_negative_space() {
        let (_w, es) = entities(2);
        let mut grid = SpatialGrid::new(2.0);
        grid.insert(es[0], Vec3::new(-0.5, -0.5, -0.5));
        let near = grid.neighbors(Vec3::new(-1.0, 0.0, 0.0), 2.0, es[1], 16);
        assert_eq!(near.len(), 1);
    }
}
