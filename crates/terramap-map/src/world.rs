mod grid_world;

pub use grid_world::GridWorld;

use terramap_core::{ChunkCoords, ColorCode, Material, CHUNK_AREA, CHUNK_SIZE};

use serde::{Deserialize, Serialize};

/// The live world the map is extracted from.
///
/// Implementations are not expected to be thread safe. A [`WorldThread`](crate::WorldThread) takes ownership of the source
/// and performs every call on its single worker thread.
pub trait WorldSource: Send + 'static {
    /// False until the world has finished loading.
    fn is_loaded(&self) -> bool;

    /// Bounding size of the world in cells. Chunk coordinates `[0, ceil(size / CHUNK_SIZE))` on each axis may exist.
    fn world_size(&self) -> WorldSize;

    /// The highest possible surface height.
    fn map_height(&self) -> u16;

    /// Copies the surface of a loaded chunk. `None` if the chunk is not currently loaded.
    fn chunk_surface(&self, coords: ChunkCoords) -> Option<ChunkSurface>;

    fn block(&self, block_id: i32) -> Option<BlockDescriptor>;

    /// Every registered block type.
    fn blocks(&self) -> Vec<BlockDescriptor>;
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WorldSize {
    pub width: u32,
    pub depth: u32,
}

impl WorldSize {
    pub fn new(width: u32, depth: u32) -> Self {
        Self { width, depth }
    }

    /// Number of chunks along x and z, counting partially covered chunks.
    pub fn in_chunks(&self) -> [u32; 2] {
        [
            (self.width + CHUNK_SIZE - 1) / CHUNK_SIZE,
            (self.depth + CHUNK_SIZE - 1) / CHUNK_SIZE,
        ]
    }
}

/// Surface heights and block ids of one chunk in [`ChunkShape`](terramap_core::ChunkShape) order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChunkSurface {
    pub heights: Vec<u16>,
    pub block_ids: Vec<i32>,
}

impl ChunkSurface {
    pub fn filled(height: u16, block_id: i32) -> Self {
        Self {
            heights: vec![height; CHUNK_AREA],
            block_ids: vec![block_id; CHUNK_AREA],
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.heights.len() == CHUNK_AREA && self.block_ids.len() == CHUNK_AREA
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlockDescriptor {
    pub id: i32,
    /// Asset path of the block type, e.g. `"blocks/terrain/snow"`.
    pub path: String,
    pub material: Material,
    /// Explicit map color; wins over everything else.
    pub color_override: Option<ColorCode>,
}

impl BlockDescriptor {
    pub fn new(id: i32, path: impl Into<String>, material: Material) -> Self {
        Self {
            id,
            path: path.into(),
            material,
            color_override: None,
        }
    }

    pub fn with_color(mut self, code: ColorCode) -> Self {
        self.color_override = Some(code);
        self
    }
}
