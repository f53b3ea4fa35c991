//! Chunked sparse tile world.
//!
//! Tiles live at integer coordinates (1 m resolution) grouped into 16³
//! chunks. The world owns chunks, chunks own tile instances, and a global
//! coord → (chunk, index) lookup stays in sync with every mutation. On top of
//! the storage sit voxel raycasts, walkability queries, the canonical
//! serialized form, a foreign tile-map importer, and a read-only vision
//! adapter.

pub mod chunk;
pub mod import;
pub mod raycast;
pub mod serialize;
pub mod tile;
pub mod vision;
pub mod world;

pub use chunk::{TileChunk, CHUNK_SIZE};
pub use import::{import_tile_map, ImportedMap, MapObject, ObjectKind};
pub use raycast::RayHit;
pub use serialize::{world_from_ron, world_to_ron, WorldFile};
pub use tile::{CollisionKind, TileDefinition, TileInstance, TileState};
pub use vision::{VisionAdapter, VisionTile};
pub use world::TileWorld;

use thiserror::Error;

/// Errors from world mutation and import.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("no tile at {0:?}")]
    TileNotFound(glam::IVec3),
    #[error("tile coordinate {0:?} already occupied")]
    Occupied(glam::IVec3),
    #[error("unknown tile definition {0}")]
    UnknownDefinition(u32),
    #[error("chunk consistency violation at {0:?}")]
    ChunkConsistency(glam::IVec3),
    #[error("invalid world format: {}", .0.join("; "))]
    InvalidFormat(Vec<String>),
}
