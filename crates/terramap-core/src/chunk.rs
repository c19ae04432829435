use crate::{local_index, ChunkCoords, ContentHash, CHUNK_AREA};

use serde::{Deserialize, Serialize};

/// Everything the map pipeline knows about one chunk: its surface heights and surface block ids, plus the digest of both.
///
/// Invariant: `heights.len() == block_ids.len() == CHUNK_AREA`, and `content_hash` is the digest of exactly these arrays.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RawChunkSummary {
    pub coords: ChunkCoords,
    pub content_hash: ContentHash,
    pub heights: Vec<u16>,
    pub block_ids: Vec<i32>,
    /// Unix milliseconds.
    pub extracted_at: u64,
}

impl RawChunkSummary {
    /// # Panics
    ///
    /// If either array does not hold exactly [`CHUNK_AREA`] cells.
    pub fn new(coords: ChunkCoords, heights: Vec<u16>, block_ids: Vec<i32>, extracted_at: u64) -> Self {
        assert_surface_len(&heights, &block_ids);
        let content_hash = ContentHash::of_surface(&heights, &block_ids);
        Self {
            coords,
            content_hash,
            heights,
            block_ids,
            extracted_at,
        }
    }

    pub fn hash_record(&self) -> ChunkHashRecord {
        ChunkHashRecord::new(self.coords, self.content_hash.clone())
    }

    pub fn height_at_local(&self, local_x: u32, local_z: u32) -> u16 {
        self.heights[local_index(local_x, local_z)]
    }

    pub fn block_at_local(&self, local_x: u32, local_z: u32) -> i32 {
        self.block_ids[local_index(local_x, local_z)]
    }
}

/// The `(coordinates, hash)` pair used for diffing. Always derived from a [`RawChunkSummary`] or a stored row.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ChunkHashRecord {
    pub coords: ChunkCoords,
    pub content_hash: ContentHash,
}

impl ChunkHashRecord {
    pub fn new(coords: ChunkCoords, content_hash: ContentHash) -> Self {
        Self {
            coords,
            content_hash,
        }
    }
}

/// The persisted form of a [`RawChunkSummary`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StoredChunk {
    pub coords: ChunkCoords,
    pub content_hash: ContentHash,
    pub heights: Vec<u16>,
    pub block_ids: Vec<i32>,
    pub extracted_at: u64,
    pub received_at: u64,
    /// Equal to `received_at` until the row is read for rendering.
    pub last_accessed_at: u64,
}

impl StoredChunk {
    pub fn from_summary(summary: RawChunkSummary, received_at: u64) -> Self {
        let RawChunkSummary {
            coords,
            content_hash,
            heights,
            block_ids,
            extracted_at,
        } = summary;
        Self {
            coords,
            content_hash,
            heights,
            block_ids,
            extracted_at,
            received_at,
            last_accessed_at: received_at,
        }
    }

    pub fn hash_record(&self) -> ChunkHashRecord {
        ChunkHashRecord::new(self.coords, self.content_hash.clone())
    }
}

/// # Panics
///
/// If the surface arrays do not both hold exactly [`CHUNK_AREA`] cells.
pub fn assert_surface_len(heights: &[u16], block_ids: &[i32]) {
    assert_eq!(heights.len(), CHUNK_AREA, "height map has wrong cell count");
    assert_eq!(block_ids.len(), CHUNK_AREA, "block id map has wrong cell count");
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
