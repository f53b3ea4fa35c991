//! Fixed-size cubic chunks of tile storage.

use crate::tile::TileInstance;
use glam::IVec3;

/// Tiles per chunk edge.
pub const CHUNK_SIZE: i32 = 16;

/// A 16³ block of tile storage. Holds an ordered sequence of instances and a
/// rebuild flag the renderer drains after mutations.
#[derive(Debug, Clone)]
pub struct TileChunk {
    pub coord: IVec3,
    tiles: Vec<TileInstance>,
    pub needs_mesh_rebuild: bool,
}

impl TileChunk {
    pub fn new(coord: IVec3) -> Self {
        Self {
            coord,
            tiles: Vec::new(),
            needs_mesh_rebuild: false,
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[TileInstance] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> Option<&TileInstance> {
        self.tiles.get(index)
    }

    pub fn tile_mut(&mut self, index: usize) -> Option<&mut TileInstance> {
        self.needs_mesh_rebuild = true;
        self.tiles.get_mut(index)
    }

    /// Append a tile, returning its index in the chunk sequence.
    pub(crate) fn push(&mut self, tile: TileInstance) -> usize {
        self.needs_mesh_rebuild = true;
        self.tiles.push(tile);
        self.tiles.len() - 1
    }

    /// Remove by swapping the last tile into the vacated slot. Returns the
    /// removed instance and, when a swap happened, the coordinate of the tile
    /// now living at `index` (whose lookup entry must be rewritten).
    pub(crate) fn swap_remove(&mut self, index: usize) -> (TileInstance, Option<IVec3>) {
        self.needs_mesh_rebuild = true;
        let removed = self.tiles.swap_remove(index);
        let moved = self.tiles.get(index).map(|t| t.coord);
        (removed, moved)
    }

    /// Chunk coordinate for a tile coordinate (floor division handles
    /// negatives).
    pub fn chunk_coord_of(tile: IVec3) -> IVec3 {
        IVec3::new(
            tile.x.div_euclid(CHUNK_SIZE),
            tile.y.div_euclid(CHUNK_SIZE),
            tile.z.div_euclid(CHUNK_SIZE),
        )
    }
}
