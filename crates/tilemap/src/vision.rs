//! Read-only vision adapter.
//!
//! Exposes the per-tile fields AI line-of-sight needs without leaking the
//! world's internal layout.

use crate::world::TileWorld;
use glam::IVec3;

/// Occlusion-relevant view of a single tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionTile {
    pub blocks_sight: bool,
    /// 0 = opaque, 1 = fully transparent.
    pub transparency: f32,
    pub height_m: f32,
    pub is_foliage: bool,
}

/// Borrowing adapter over the tile world.
pub struct VisionAdapter<'a> {
    world: &'a TileWorld,
}

impl<'a> VisionAdapter<'a> {
    pub fn new(world: &'a TileWorld) -> Self {
        Self { world }
    }

    /// Vision data for the tile at `coord`; `None` for empty cells.
    pub fn sample(&self, coord: IVec3) -> Option<VisionTile> {
        let tile = self.world.tile_at(coord)?;
        if !tile.is_active {
            return None;
        }
        let def = self.world.definition_of(tile)?;
        Some(VisionTile {
            blocks_sight: def.blocks_sight,
            transparency: def.transparency,
            height_m: def.height_meters,
            is_foliage: def.is_foliage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{TileDefinition, TileInstance};

    #[test]
    fn adapter_reflects_definition_fields() {
        let mut w = TileWorld::new();
        let mut def = TileDefinition::simple(1, "hedge", "tiles/hedge.glb");
        def.is_foliage = true;
        def.transparency = 0.4;
        def.height_meters = 1.8;
        w.register_definition(def);
        w.insert_tile(TileInstance::new(1, IVec3::ZERO)).unwrap();

        let adapter = VisionAdapter::new(&w);
        let v = adapter.sample(IVec3::ZERO).unwrap();
        assert!(v.blocks_sight);
        assert!(v.is_foliage);
        assert!((v.transparency - 0.4).abs() < 1e-6);
        assert!(adapter.sample(IVec3::new(1, 0, 0)).is_none());
    }

    #[test]
    fn inactive_tiles_do_not_occlude() {
        let mut w = TileWorld::new();
        w.register_definition(TileDefinition::simple(1, "wall", "tiles/wall.glb"));
        let mut t = TileInstance::new(1, IVec3::ZERO);
        t.is_active = false;
        w.insert_tile(t).unwrap();
        assert!(VisionAdapter::new(&w).sample(IVec3::ZERO).is_none());
    }
}
