//! Import of foreign 2D tile maps (Tiled-style JSON).
//!
//! The map is a nested document: global grid dimensions, tilesets carrying
//! per-tile custom properties, and a list of layers. Tile layers become one
//! vertical level each (layer 0 at y = 0); object groups pass through to the
//! caller. All validation errors are aggregated and a non-empty list refuses
//! the whole import.

use crate::tile::{CollisionKind, TileDefinition, TileInstance};
use crate::world::TileWorld;
use crate::WorldError;
use glam::IVec3;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct TiledMap {
    width: u32,
    height: u32,
    #[allow(dead_code)]
    tile_width: u32,
    #[allow(dead_code)]
    tile_height: u32,
    #[serde(default)]
    tilesets: Vec<TiledTileset>,
    #[serde(default)]
    layers: Vec<TiledLayer>,
}

#[derive(Debug, Deserialize)]
struct TiledTileset {
    first_gid: u32,
    /// External tileset reference; unresolved tiles get default definitions.
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tiles: Vec<TiledTilesetTile>,
}

#[derive(Debug, Deserialize)]
struct TiledTilesetTile {
    id: u32,
    #[serde(default)]
    properties: TileProperties,
}

#[derive(Debug, Default, Deserialize)]
struct TileProperties {
    mesh_path: Option<String>,
    height: Option<f32>,
    collision_type: Option<String>,
    material_id: Option<u32>,
    walkable: Option<bool>,
    blocks_sight: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TiledLayer {
    #[serde(rename = "tilelayer")]
    Tile {
        #[serde(default)]
        name: String,
        data: Vec<u32>,
    },
    #[serde(rename = "objectgroup")]
    Objects {
        #[serde(default)]
        name: String,
        objects: Vec<TiledObject>,
    },
}

#[derive(Debug, Deserialize)]
struct TiledObject {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    x: f32,
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Object categories the core recognizes; everything else passes through
/// unchanged for callers.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    SpawnPoint,
    Light,
    Trigger,
    Other(String),
}

impl ObjectKind {
    fn parse(raw: &str) -> Self {
        match raw {
            "spawn_point" => ObjectKind::SpawnPoint,
            "light" => ObjectKind::Light,
            "trigger" => ObjectKind::Trigger,
            other => ObjectKind::Other(other.to_string()),
        }
    }
}

/// A placed map object from an object-group layer.
#[derive(Debug, Clone)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub kind: ObjectKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
    pub properties: Map<String, Value>,
}

/// Result of a successful import: the built world plus passthrough objects.
pub struct ImportedMap {
    pub world: TileWorld,
    pub objects: Vec<MapObject>,
}

fn parse_collision(raw: &str) -> Option<CollisionKind> {
    match raw {
        "none" => Some(CollisionKind::None),
        "box" => Some(CollisionKind::Box),
        "sphere" => Some(CollisionKind::Sphere),
        "mesh" => Some(CollisionKind::Mesh),
        _ => None,
    }
}

/// Parse and import a Tiled-style JSON document.
pub fn import_tile_map(json: &str) -> Result<ImportedMap, WorldError> {
    let map: TiledMap =
        serde_json::from_str(json).map_err(|e| WorldError::InvalidFormat(vec![e.to_string()]))?;

    let mut errors: Vec<String> = Vec::new();
    if map.width == 0 || map.height == 0 {
        errors.push("map dimensions must be positive".to_string());
    }

    // gid → definition, built from tileset properties. Definitions are keyed
    // by global id so layers can reference them directly.
    let mut definitions: HashMap<u32, TileDefinition> = HashMap::new();
    for (ts_index, ts) in map.tilesets.iter().enumerate() {
        if ts.first_gid == 0 {
            errors.push(format!("tileset #{ts_index}: first_gid 0 is reserved for empty"));
            continue;
        }
        if ts.tiles.is_empty() {
            if let Some(source) = &ts.source {
                log::warn!(
                    "tileset #{ts_index} is external ({source}); imported tiles get default definitions"
                );
            }
            continue;
        }
        for tile in &ts.tiles {
            let gid = ts.first_gid + tile.id;
            let p = &tile.properties;
            let collision = match p.collision_type.as_deref() {
                None => CollisionKind::Box,
                Some(raw) => match parse_collision(raw) {
                    Some(kind) => kind,
                    None => {
                        errors.push(format!("tileset #{ts_index} tile {}: unknown collision_type '{raw}'", tile.id));
                        CollisionKind::Box
                    }
                },
            };
            let mut def = TileDefinition::simple(
                gid,
                &format!("imported_{gid}"),
                p.mesh_path.as_deref().unwrap_or("tiles/default.glb"),
            );
            def.height_meters = p.height.unwrap_or(1.0);
            def.collision_type = collision;
            def.material_id = p.material_id.unwrap_or(0);
            def.walkable = p.walkable.unwrap_or(false);
            def.blocks_sight = p.blocks_sight.unwrap_or(true);
            definitions.insert(gid, def);
        }
    }

    let mut world = TileWorld::new();
    for def in definitions.values() {
        world.register_definition(def.clone());
    }

    let mut objects = Vec::new();
    let mut tile_layer_index: i32 = 0;
    for layer in &map.layers {
        match layer {
            TiledLayer::Tile { name, data } => {
                if data.len() != (map.width * map.height) as usize {
                    errors.push(format!(
                        "layer '{name}': data length {} does not match {}x{}",
                        data.len(),
                        map.width,
                        map.height
                    ));
                    tile_layer_index += 1;
                    continue;
                }
                for (i, &gid) in data.iter().enumerate() {
                    if gid == 0 {
                        continue; // empty cell
                    }
                    let col = (i as u32 % map.width) as i32;
                    let row = (i as u32 / map.width) as i32;
                    let coord = IVec3::new(col, tile_layer_index, row);
                    if !definitions.contains_key(&gid) {
                        // Unresolved gid: either an external tileset or a bad
                        // reference. External tilesets degrade to defaults.
                        let covered = map
                            .tilesets
                            .iter()
                            .any(|ts| ts.source.is_some() && gid >= ts.first_gid);
                        if covered {
                            let def = TileDefinition::simple(
                                gid,
                                &format!("external_{gid}"),
                                "tiles/default.glb",
                            );
                            world.register_definition(def.clone());
                            definitions.insert(gid, def);
                        } else {
                            errors.push(format!("layer '{name}': gid {gid} matches no tileset"));
                            continue;
                        }
                    }
                    if let Err(e) = world.insert_tile(TileInstance::new(gid, coord)) {
                        errors.push(format!("layer '{name}': {e}"));
                    }
                }
                tile_layer_index += 1;
            }
            TiledLayer::Objects { name: _, objects: objs } => {
                for o in objs {
                    objects.push(MapObject {
                        id: o.id,
                        name: o.name.clone(),
                        kind: ObjectKind::parse(&o.kind),
                        x: o.x,
                        y: o.y,
                        width: o.width,
                        height: o.height,
                        rotation: o.rotation,
                        properties: o.properties.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(ImportedMap { world, objects })
    } else {
        Err(WorldError::InvalidFormat(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"{
            "width": 2,
            "height": 2,
            "tile_width": 32,
            "tile_height": 32,
            "tilesets": [{
                "first_gid": 1,
                "tiles": [
                    {"id": 0, "properties": {"mesh_path": "tiles/stone.glb", "height": 2.0, "collision_type": "box", "material_id": 3, "walkable": false, "blocks_sight": true}},
                    {"id": 1, "properties": {"mesh_path": "tiles/grass.glb", "collision_type": "none", "walkable": true}}
                ]
            }],
            "layers": [
                {"type": "tilelayer", "name": "ground", "data": [1, 2, 0, 1]},
                {"type": "objectgroup", "name": "meta", "objects": [
                    {"id": 5, "name": "start", "type": "spawn_point", "x": 16.0, "y": 16.0},
                    {"id": 6, "name": "lamp", "type": "light", "x": 40.0, "y": 8.0},
                    {"id": 7, "name": "custom", "type": "loot_chest", "x": 1.0, "y": 2.0}
                ]}
            ]
        }"#
        .to_string()
    }

    #[test]
    fn import_builds_world_and_objects() {
        let imported = import_tile_map(&sample_json()).unwrap();
        assert_eq!(imported.world.tile_count(), 3);
        let stone = imported.world.tile_at(IVec3::new(0, 0, 0)).unwrap();
        let def = imported.world.definition_of(stone).unwrap();
        assert_eq!(def.mesh_path, "tiles/stone.glb");
        assert_eq!(def.height_meters, 2.0);
        assert_eq!(def.material_id, 3);

        assert_eq!(imported.objects.len(), 3);
        assert_eq!(imported.objects[0].kind, ObjectKind::SpawnPoint);
        assert_eq!(imported.objects[1].kind, ObjectKind::Light);
        assert_eq!(
            imported.objects[2].kind,
            ObjectKind::Other("loot_chest".to_string())
        );
    }

    #[test]
    fn gid_zero_means_empty() {
        let imported = import_tile_map(&sample_json()).unwrap();
        assert!(imported.world.tile_at(IVec3::new(0, 0, 1)).is_none());
    }

    #[test]
    fn bad_gid_and_bad_length_aggregate_errors() {
        let json = r#"{
            "width": 2, "height": 1, "tile_width": 32, "tile_height": 32,
            "tilesets": [{"first_gid": 1, "tiles": [{"id": 0, "properties": {}}]}],
            "layers": [
                {"type": "tilelayer", "name": "a", "data": [9, 1]},
                {"type": "tilelayer", "name": "b", "data": [1]}
            ]
        }"#;
        match import_tile_map(json) {
            Err(WorldError::InvalidFormat(errors)) => {
                assert_eq!(errors.len(), 2, "{errors:?}");
            }
            other => panic!("expected aggregated failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_collision_type_is_an_error() {
        let json = r#"{
            "width": 1, "height": 1, "tile_width": 32, "tile_height": 32,
            "tilesets": [{"first_gid": 1, "tiles": [{"id": 0, "properties": {"collision_type": "wedge"}}]}],
            "layers": [{"type": "tilelayer", "name": "a", "data": [1]}]
        }"#;
        assert!(matches!(
            import_tile_map(json),
            Err(WorldError::InvalidFormat(_))
        ));
    }
}
