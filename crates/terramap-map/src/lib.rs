//! Extraction, persistence, and synchronization of chunk surfaces.
//!
//! # World Side
//!
//! The live world is only ever touched from its own thread. A [`WorldThread`] owns the [`WorldSource`] and runs queued reads
//! on it; a [`ChunkExtractor`] turns those reads into [`RawChunkSummary`](terramap_core::RawChunkSummary)s and hash records.
//! A [`SyncAgent`] answers the storage side's manifests and requests over a [`Transport`].
//!
//! # Storage Side
//!
//! A [`ChunkStore`] keeps one [`MapDb`] per world in a shared `sled` database. Each world gets four trees: compressed chunk
//! rows, content hashes, last-access timestamps, and metadata (the block color table). All trees are keyed by
//! [`ChunkDbKey`], whose byte order matches the x-major order of chunk coordinates, so every tile group is a handful of
//! range scans.

mod config;
mod database;
mod extractor;
mod store;
mod sync;
mod world;
mod world_thread;

pub use config::*;
pub use database::*;
pub use extractor::*;
pub use store::*;
pub use sync::*;
pub use world::*;
pub use world_thread::*;

// Re-exports.
pub use sled;
