//! Tile definitions and placed instances.

use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collision behavior of a tile's definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionKind {
    /// Never blocks rays or bodies.
    None,
    #[default]
    Box,
    Sphere,
    Mesh,
}

impl CollisionKind {
    pub fn is_solid(self) -> bool {
        !matches!(self, CollisionKind::None)
    }
}

/// Immutable shared tile archetype, created at scene load and identified by a
/// stable integer id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDefinition {
    pub id: u32,
    pub name: String,
    pub mesh_path: String,
    pub height_meters: f32,
    pub collision_type: CollisionKind,
    pub walkable: bool,
    pub material_id: u32,
    pub tint_color: [f32; 3],
    pub blocks_sight: bool,
    /// 0 = opaque, 1 = fully transparent.
    pub transparency: f32,
    pub is_foliage: bool,
    pub interactable: bool,
    pub interaction_type: Option<String>,
    #[serde(default)]
    pub custom_properties: HashMap<String, String>,
}

impl TileDefinition {
    /// Minimal definition for tests and procedural placement.
    pub fn simple(id: u32, name: &str, mesh_path: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            mesh_path: mesh_path.to_string(),
            height_meters: 1.0,
            collision_type: CollisionKind::Box,
            walkable: false,
            material_id: 0,
            tint_color: [1.0, 1.0, 1.0],
            blocks_sight: true,
            transparency: 0.0,
            is_foliage: false,
            interactable: false,
            interaction_type: None,
            custom_properties: HashMap::new(),
        }
    }

    pub fn walkable(mut self, walkable: bool) -> Self {
        self.walkable = walkable;
        self
    }

    pub fn collision(mut self, kind: CollisionKind) -> Self {
        self.collision_type = kind;
        self
    }

    pub fn material(mut self, material_id: u32) -> Self {
        self.material_id = material_id;
        self
    }
}

/// Progressive damage ladder for a placed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TileState {
    #[default]
    Intact,
    Scratched,
    Cracked,
    Damaged,
    Failing,
    Critical,
    Collapsed,
}

impl TileState {
    /// Map remaining health fraction onto the damage ladder.
    pub fn from_health(health: f32) -> Self {
        match health {
            h if h >= 0.95 => TileState::Intact,
            h if h >= 0.80 => TileState::Scratched,
            h if h >= 0.60 => TileState::Cracked,
            h if h >= 0.40 => TileState::Damaged,
            h if h >= 0.20 => TileState::Failing,
            h if h > 0.0 => TileState::Critical,
            _ => TileState::Collapsed,
        }
    }
}

/// A concrete placement of a definition at a coordinate. Owned by exactly
/// one chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileInstance {
    pub definition_id: u32,
    pub coord: IVec3,
    pub rotation_degrees: f32,
    pub is_active: bool,
    /// Remaining structural health in [0, 1].
    pub health: f32,
    pub state: TileState,
    pub custom_tint: Option<[f32; 3]>,
    pub custom_material: Option<u32>,
}

impl TileInstance {
    pub fn new(definition_id: u32, coord: IVec3) -> Self {
        Self {
            definition_id,
            coord,
            rotation_degrees: 0.0,
            is_active: true,
            health: 1.0,
            state: TileState::Intact,
            custom_tint: None,
            custom_material: None,
        }
    }

    /// Apply damage as a health fraction; updates the damage ladder and
    /// returns the new state.
    pub fn apply_damage(&mut self, fraction: f32) -> TileState {
        self.health = (self.health - fraction).clamp(0.0, 1.0);
        self.state = TileState::from_health(self.health);
        self.state
    }
}
