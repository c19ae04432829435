//! Storage-side services of the terramap pipeline.
//!
//! The world side lives in [`terramap_map`]: it extracts chunk surfaces and answers sync messages. This crate hosts the other
//! end. A [`SyncService`] persists what the world side sends, and a [`MapService`] serves rendered tiles, keeping its tile
//! cache coherent with every chunk write.

mod config;
mod map_service;
mod sync_service;

pub use config::Config;
pub use map_service::MapService;
pub use sync_service::{SyncOutcome, SyncService};

// Re-exports.
pub use terramap_core;
pub use terramap_map;
pub use terramap_render;
