//! Shared data model for the terramap pipeline.
//!
//! # Chunks
//!
//! The world is partitioned into square [`ChunkCoords`] regions of [`CHUNK_SIZE`] x [`CHUNK_SIZE`] cells. For map purposes a
//! chunk is only described by its surface: one height and one block id per cell, stored in [`ChunkShape`] order. The pair of
//! arrays is summarized by a [`ContentHash`], which is the only equality oracle used to decide whether a chunk must be
//! transferred or re-rendered.
//!
//! # Groups
//!
//! Rendered imagery is organized in [`GroupCoords`] tiles of [`CHUNKS_PER_GROUP`] x [`CHUNKS_PER_GROUP`] chunks, one pixel
//! per cell.
//!
//! # Colors
//!
//! Block ids map to semantic [`ColorCode`]s, which map to packed ARGB values. See [`palette`].

pub mod bytes;
pub mod chunk;
pub mod coordinates;
pub mod hash;
pub mod palette;
pub mod work_timer;

pub use chunk::*;
pub use coordinates::*;
pub use hash::*;
pub use palette::*;

use ahash::{AHashMap, AHashSet};
pub type SmallKeyHashMap<K, V> = AHashMap<K, V>;
pub type SmallKeyHashSet<K> = AHashSet<K>;

// Re-exports.
pub use ndshape;
pub use static_assertions;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Clocks set before 1970 read as zero.
pub fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
