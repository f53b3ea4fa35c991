//! The tile world: chunk storage plus the global coordinate lookup.

use crate::chunk::TileChunk;
use crate::tile::{TileDefinition, TileInstance};
use crate::WorldError;
use glam::{IVec3, Vec3};
use std::collections::HashMap;

/// Where a tile lives: owning chunk and index into its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSlot {
    pub chunk: IVec3,
    pub index: usize,
}

/// Sparse 3D grid of tile instances grouped into cubic chunks.
///
/// Invariants: for every tile in a chunk's sequence the lookup points back at
/// it; chunk membership equals the floor-divided chunk coordinate; at most
/// one tile per coordinate.
pub struct TileWorld {
    definitions: HashMap<u32, TileDefinition>,
    chunks: HashMap<IVec3, TileChunk>,
    lookup: HashMap<IVec3, TileSlot>,
    tile_size: f32,
}

impl Default for TileWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TileWorld {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            chunks: HashMap::new(),
            lookup: HashMap::new(),
            tile_size: 1.0,
        }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    // ── Definitions ────────────────────────────────────────────────────

    /// Register a definition; later registrations with the same id win.
    pub fn register_definition(&mut self, def: TileDefinition) {
        self.definitions.insert(def.id, def);
    }

    pub fn definition(&self, id: u32) -> Option<&TileDefinition> {
        self.definitions.get(&id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TileDefinition> {
        self.definitions.values()
    }

    /// Definition for a placed tile, honoring per-instance overrides is the
    /// caller's concern; this resolves the shared record.
    pub fn definition_of(&self, tile: &TileInstance) -> Option<&TileDefinition> {
        self.definitions.get(&tile.definition_id)
    }

    // ── Coordinate conversions ─────────────────────────────────────────

    /// World position → containing tile coordinate (component-wise floor).
    pub fn world_to_tile(&self, p: Vec3) -> IVec3 {
        IVec3::new(
            (p.x / self.tile_size).floor() as i32,
            (p.y / self.tile_size).floor() as i32,
            (p.z / self.tile_size).floor() as i32,
        )
    }

    /// Tile coordinate → world position of the tile center.
    pub fn tile_to_world(&self, c: IVec3) -> Vec3 {
        (c.as_vec3() + Vec3::splat(0.5)) * self.tile_size
    }

    // ── Tile access ────────────────────────────────────────────────────

    pub fn tile_at(&self, coord: IVec3) -> Option<&TileInstance> {
        let slot = self.lookup.get(&coord)?;
        self.chunks.get(&slot.chunk)?.tile(slot.index)
    }

    /// Mutate a tile in place; marks the owning chunk for mesh rebuild.
    pub fn modify_tile<F>(&mut self, coord: IVec3, f: F) -> Result<(), WorldError>
    where
        F: FnOnce(&mut TileInstance),
    {
        let slot = *self
            .lookup
            .get(&coord)
            .ok_or(WorldError::TileNotFound(coord))?;
        let chunk = self
            .chunks
            .get_mut(&slot.chunk)
            .ok_or(WorldError::ChunkConsistency(slot.chunk))?;
        let tile = chunk
            .tile_mut(slot.index)
            .ok_or(WorldError::ChunkConsistency(slot.chunk))?;
        f(tile);
        Ok(())
    }

    /// Insert a tile. Fails without mutation when the coordinate is occupied
    /// or the definition is unknown.
    pub fn insert_tile(&mut self, tile: TileInstance) -> Result<(), WorldError> {
        if self.lookup.contains_key(&tile.coord) {
            return Err(WorldError::Occupied(tile.coord));
        }
        if !self.definitions.contains_key(&tile.definition_id) {
            return Err(WorldError::UnknownDefinition(tile.definition_id));
        }
        let chunk_coord = TileChunk::chunk_coord_of(tile.coord);
        let coord = tile.coord;
        let chunk = self
            .chunks
            .entry(chunk_coord)
            .or_insert_with(|| TileChunk::new(chunk_coord));
        let index = chunk.push(tile);
        self.lookup.insert(
            coord,
            TileSlot {
                chunk: chunk_coord,
                index,
            },
        );
        Ok(())
    }

    /// Remove a tile. The chunk's last tile is swapped into the vacated slot
    /// and the lookup entry for the swapped tile rewritten. An emptied chunk
    /// stays allocated (dirty) until [`TileWorld::clear`] or
    /// [`TileWorld::unload_chunk`].
    pub fn remove_tile(&mut self, coord: IVec3) -> Result<TileInstance, WorldError> {
        let slot = self
            .lookup
            .remove(&coord)
            .ok_or(WorldError::TileNotFound(coord))?;
        let chunk = self
            .chunks
            .get_mut(&slot.chunk)
            .ok_or(WorldError::ChunkConsistency(slot.chunk))?;
        let (removed, moved) = chunk.swap_remove(slot.index);
        if let Some(moved_coord) = moved {
            self.lookup.insert(
                moved_coord,
                TileSlot {
                    chunk: slot.chunk,
                    index: slot.index,
                },
            );
        }
        Ok(removed)
    }

    /// Drop every chunk and the lookup.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.lookup.clear();
    }

    /// Explicitly drop one (typically empty) chunk and any tiles it held.
    pub fn unload_chunk(&mut self, chunk_coord: IVec3) {
        if let Some(chunk) = self.chunks.remove(&chunk_coord) {
            for tile in chunk.tiles() {
                self.lookup.remove(&tile.coord);
            }
        }
    }

    pub fn tile_count(&self) -> usize {
        self.lookup.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, coord: IVec3) -> Option<&TileChunk> {
        self.chunks.get(&coord)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TileChunk> {
        self.chunks.values()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileInstance> {
        self.chunks.values().flat_map(|c| c.tiles().iter())
    }

    /// Coordinates of chunks whose meshes need rebuilding.
    pub fn dirty_chunks(&self) -> Vec<IVec3> {
        self.chunks
            .values()
            .filter(|c| c.needs_mesh_rebuild)
            .map(|c| c.coord)
            .collect()
    }

    /// Acknowledge a rebuild; the renderer calls this after re-meshing.
    pub fn mark_chunk_rebuilt(&mut self, chunk_coord: IVec3) {
        if let Some(chunk) = self.chunks.get_mut(&chunk_coord) {
            chunk.needs_mesh_rebuild = false;
        }
    }

    // ── Invariants ─────────────────────────────────────────────────────

    /// Verify the storage invariants. Debug assertions call this after
    /// mutations in tests; release builds recover from violations with
    /// [`TileWorld::clear`].
    pub fn check_consistency(&self) -> Result<(), WorldError> {
        for (chunk_coord, chunk) in &self.chunks {
            for (index, tile) in chunk.tiles().iter().enumerate() {
                if TileChunk::chunk_coord_of(tile.coord) != *chunk_coord {
                    return Err(WorldError::ChunkConsistency(*chunk_coord));
                }
                match self.lookup.get(&tile.coord) {
                    Some(slot) if slot.chunk == *chunk_coord && slot.index == index => {}
                    _ => return Err(WorldError::ChunkConsistency(*chunk_coord)),
                }
            }
        }
        let stored: usize = self.chunks.values().map(|c| c.len()).sum();
        if stored != self.lookup.len() {
            log::error!(
                "tile lookup holds {} entries but chunks hold {} tiles",
                self.lookup.len(),
                stored
            );
            return Err(WorldError::ChunkConsistency(IVec3::ZERO));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileDefinition;

    fn world_with_def() -> TileWorld {
        let mut w = TileWorld::new();
        w.register_definition(TileDefinition::simple(1, "wall", "tiles/wall.glb"));
        w
    }

    #[test]
    fn world_to_tile_floors_negative_coordinates() {
        let w = TileWorld::new();
        assert_eq!(w.world_to_tile(Vec3::new(-0.1, 0.5, 2.9)), IVec3::new(-1, 0, 2));
        assert_eq!(w.tile_to_world(IVec3::new(-1, 0, 2)), Vec3::new(-0.5, 0.5, 2.5));
    }

    #[test]
    fn insert_then_remove_keeps_lookup_consistent() {
        let mut w = world_with_def();
        for x in 0..20 {
            w.insert_tile(TileInstance::new(1, IVec3::new(x, 0, 0))).unwrap();
        }
        w.check_consistency().unwrap();
        // Remove from the middle of a chunk so swap-remove must rewrite.
        w.remove_tile(IVec3::new(3, 0, 0)).unwrap();
        w.remove_tile(IVec3::new(17, 0, 0)).unwrap();
        w.check_consistency().unwrap();
        assert_eq!(w.tile_count(), 18);
        assert!(w.tile_at(IVec3::new(3, 0, 0)).is_none());
        assert!(w.tile_at(IVec3::new(15, 0, 0)).is_some());
    }

    #[test]
    fn double_insert_is_rejected_without_mutation() {
        let mut w = world_with_def();
        w.insert_tile(TileInstance::new(1, IVec3::ZERO)).unwrap();
        let err = w.insert_tile(TileInstance::new(1, IVec3::ZERO)).unwrap_err();
        assert!(matches!(err, WorldError::Occupied(_)));
        assert_eq!(w.tile_count(), 1);
        w.check_consistency().unwrap();
    }

    #[test]
    fn emptied_chunk_remains_until_cleared() {
        let mut w = world_with_def();
        w.insert_tile(TileInstance::new(1, IVec3::ZERO)).unwrap();
        w.remove_tile(IVec3::ZERO).unwrap();
        assert_eq!(w.chunk_count(), 1);
        assert!(w.chunk(IVec3::ZERO).unwrap().is_empty());
        w.clear();
        assert_eq!(w.chunk_count(), 0);
    }

    #[test]
    fn mutation_marks_chunk_dirty() {
        let mut w = world_with_def();
        w.insert_tile(TileInstance::new(1, IVec3::ZERO)).unwrap();
        w.mark_chunk_rebuilt(IVec3::ZERO);
        assert!(w.dirty_chunks().is_empty());
        w.modify_tile(IVec3::ZERO, |t| {
            t.apply_damage(0.3);
        })
        .unwrap();
        assert_eq!(w.dirty_chunks(), vec![IVec3::ZERO]);
    }

    #[test]
    fn removing_unknown_tile_reports_not_found() {
        let mut w = world_with_def();
        assert!(matches!(
            w.remove_tile(IVec3::new(5, 5, 5)),
            Err(WorldError::TileNotFound(_))
        ));
    }
}
