//! Canonical persistent world format.
//!
//! Definitions plus a flat tile list; round-trips reproduce the same world up
//! to chunk iteration order. RON is the on-disk encoding, matching the rest
//! of the project's config files.

use crate::tile::{CollisionKind, TileDefinition, TileInstance, TileState};
use crate::world::TileWorld;
use crate::WorldError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serialized tile definition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDefinitionRecord {
    pub id: u32,
    pub name: String,
    pub mesh_path: String,
    pub height_meters: f32,
    pub collision_type: CollisionKind,
    pub walkable: bool,
    pub material_id: u32,
    pub tint_color: [f32; 3],
    pub blocks_sight: bool,
    pub transparency: f32,
    pub is_foliage: bool,
    pub interactable: bool,
    pub interaction_type: Option<String>,
    #[serde(default)]
    pub custom_properties: HashMap<String, String>,
}

/// Serialized placed tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileRecord {
    pub definition_id: u32,
    pub coord: [i32; 3],
    pub rotation_degrees: f32,
    pub is_active: bool,
    pub health: f32,
    #[serde(default)]
    pub custom_tint: Option<[f32; 3]>,
    #[serde(default)]
    pub custom_material: Option<u32>,
}

/// The canonical world file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldFile {
    pub tile_definitions: Vec<TileDefinitionRecord>,
    pub tiles: Vec<TileRecord>,
}

impl WorldFile {
    /// Snapshot a live world. Definitions and tiles are sorted for a stable
    /// on-disk form.
    pub fn from_world(world: &TileWorld) -> Self {
        let mut tile_definitions: Vec<TileDefinitionRecord> = world
            .definitions()
            .map(|d| TileDefinitionRecord {
                id: d.id,
                name: d.name.clone(),
                mesh_path: d.mesh_path.clone(),
                height_meters: d.height_meters,
                collision_type: d.collision_type,
                walkable: d.walkable,
                material_id: d.material_id,
                tint_color: d.tint_color,
                blocks_sight: d.blocks_sight,
                transparency: d.transparency,
                is_foliage: d.is_foliage,
                interactable: d.interactable,
                interaction_type: d.interaction_type.clone(),
                custom_properties: d.custom_properties.clone(),
            })
            .collect();
        tile_definitions.sort_by_key(|d| d.id);

        let mut tiles: Vec<TileRecord> = world
            .tiles()
            .map(|t| TileRecord {
                definition_id: t.definition_id,
                coord: [t.coord.x, t.coord.y, t.coord.z],
                rotation_degrees: t.rotation_degrees,
                is_active: t.is_active,
                health: t.health,
                custom_tint: t.custom_tint,
                custom_material: t.custom_material,
            })
            .collect();
        tiles.sort_by_key(|t| (t.coord[0], t.coord[1], t.coord[2]));

        Self {
            tile_definitions,
            tiles,
        }
    }

    /// Rebuild a world. All errors are aggregated; a non-empty error list
    /// refuses the import and leaves no partial world behind.
    pub fn into_world(self) -> Result<TileWorld, WorldError> {
        let mut errors = Vec::new();
        let mut world = TileWorld::new();

        for d in self.tile_definitions {
            if !(0.0..=1.0).contains(&d.transparency) {
                errors.push(format!("definition {}: transparency out of range", d.id));
            }
            if d.height_meters <= 0.0 {
                errors.push(format!("definition {}: non-positive height", d.id));
            }
            world.register_definition(TileDefinition {
                id: d.id,
                name: d.name,
                mesh_path: d.mesh_path,
                height_meters: d.height_meters,
                collision_type: d.collision_type,
                walkable: d.walkable,
                material_id: d.material_id,
                tint_color: d.tint_color,
                blocks_sight: d.blocks_sight,
                transparency: d.transparency,
                is_foliage: d.is_foliage,
                interactable: d.interactable,
                interaction_type: d.interaction_type,
                custom_properties: d.custom_properties,
            });
        }

        for t in self.tiles {
            let coord = glam::IVec3::from(t.coord);
            let mut tile = TileInstance::new(t.definition_id, coord);
            tile.rotation_degrees = t.rotation_degrees;
            tile.is_active = t.is_active;
            tile.health = t.health.clamp(0.0, 1.0);
            tile.state = TileState::from_health(tile.health);
            tile.custom_tint = t.custom_tint;
            tile.custom_material = t.custom_material;
            match world.insert_tile(tile) {
                Ok(()) => {}
                Err(WorldError::Occupied(c)) => {
                    errors.push(format!("duplicate tile at {:?}", c));
                }
                Err(WorldError::UnknownDefinition(id)) => {
                    errors.push(format!("tile at {:?} references unknown definition {}", coord, id));
                }
                Err(e) => errors.push(e.to_string()),
            }
        }

        if errors.is_empty() {
            Ok(world)
        } else {
            Err(WorldError::InvalidFormat(errors))
        }
    }
}

/// Serialize a world to RON text.
pub fn world_to_ron(world: &TileWorld) -> Result<String, WorldError> {
    ron::ser::to_string_pretty(&WorldFile::from_world(world), ron::ser::PrettyConfig::default())
        .map_err(|e| WorldError::InvalidFormat(vec![e.to_string()]))
}

/// Deserialize a world from RON text.
pub fn world_from_ron(text: &str) -> Result<TileWorld, WorldError> {
    let file: WorldFile =
        ron::from_str(text).map_err(|e| WorldError::InvalidFormat(vec![e.to_string()]))?;
    file.into_world()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    fn sample_world() -> TileWorld {
        let mut w = TileWorld::new();
        w.register_definition(TileDefinition::simple(1, "wall", "tiles/wall.glb"));
        w.register_definition(TileDefinition::simple(7, "floor", "tiles/floor.glb").walkable(true));
        for x in -2..3 {
            w.insert_tile(TileInstance::new(1, IVec3::new(x, 0, 0))).unwrap();
            w.insert_tile(TileInstance::new(7, IVec3::new(x, -1, 0))).unwrap();
        }
        w.modify_tile(IVec3::new(0, 0, 0), |t| {
            t.apply_damage(0.5);
        })
        .unwrap();
        w
    }

    /// Serialize then deserialize reproduces the identical tile set.
    #[test]
    fn ron_round_trip_preserves_world() {
        let world = sample_world();
        let text = world_to_ron(&world).unwrap();
        let restored = world_from_ron(&text).unwrap();

        assert_eq!(restored.tile_count(), world.tile_count());
        for tile in world.tiles() {
            let other = restored.tile_at(tile.coord).expect("tile survives");
            assert_eq!(other.definition_id, tile.definition_id);
            assert!((other.health - tile.health).abs() < 1e-6);
            assert_eq!(other.state, tile.state);
        }
        restored.check_consistency().unwrap();
    }

    #[test]
    fn import_aggregates_all_errors() {
        let file = WorldFile {
            tile_definitions: vec![],
            tiles: vec![
                TileRecord {
                    definition_id: 9,
                    coord: [0, 0, 0],
                    rotation_degrees: 0.0,
                    is_active: true,
                    health: 1.0,
                    custom_tint: None,
                    custom_material: None,
                },
                TileRecord {
                    definition_id: 10,
                    coord: [1, 0, 0],
                    rotation_degrees: 0.0,
                    is_active: true,
                    health: 1.0,
                    custom_tint: None,
                    custom_material: None,
                },
            ],
        };
        match file.into_world() {
            Err(WorldError::InvalidFormat(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected aggregated errors, got {:?}", other.map(|_| ())),
        }
    }
}
