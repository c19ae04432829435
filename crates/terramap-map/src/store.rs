use crate::database::{MapDb, MapDbError, MapDbMetadata};

use terramap_core::{
    unix_millis_now, BlockColorMap, ChunkCoords, ChunkHashRecord, ContentHash, GroupCoords,
    RawChunkSummary, SmallKeyHashMap, StoredChunk,
};

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Asynchronous, multi-world front for [`MapDb`].
///
/// Each world id gets its own [`MapDb`] (opened on first use) inside one shared [`sled::Db`]. Every call runs on tokio's
/// blocking pool, so callers on the async runtime never wait on disk I/O directly.
#[derive(Clone)]
pub struct ChunkStore {
    db: sled::Db,
    worlds: Arc<Mutex<SmallKeyHashMap<String, Arc<MapDb>>>>,
}

impl ChunkStore {
    pub fn new(db: sled::Db) -> Self {
        Self {
            db,
            worlds: Default::default(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, MapDbError> {
        let db = sled::Config::default()
            .path(path.as_ref())
            .mode(sled::Mode::LowSpace)
            .open()?;
        Ok(Self::new(db))
    }

    pub fn temporary() -> Result<Self, MapDbError> {
        Ok(Self::new(sled::Config::default().temporary(true).open()?))
    }

    /// The [`MapDb`] for `world_id`, opening its trees if needed. This touches disk, so async callers should go through the
    /// methods below instead.
    pub fn world(&self, world_id: &str) -> Result<Arc<MapDb>, MapDbError> {
        if let Some(map) = self.worlds.lock().get(world_id) {
            return Ok(map.clone());
        }
        let map = Arc::new(MapDb::open(&self.db, world_id)?);
        // Another caller may have raced us here; either handle refers to the same trees.
        Ok(self
            .worlds
            .lock()
            .entry(world_id.to_owned())
            .or_insert(map)
            .clone())
    }

    pub async fn store_chunk(&self, world_id: &str, summary: RawChunkSummary) -> Result<bool, MapDbError> {
        self.blocking(world_id, move |map| map.store_chunk(&summary, unix_millis_now()))
            .await
    }

    pub async fn chunk_hash(
        &self,
        world_id: &str,
        coords: ChunkCoords,
    ) -> Result<Option<ContentHash>, MapDbError> {
        self.blocking(world_id, move |map| map.chunk_hash(coords)).await
    }

    /// Stored hashes for whichever of `coords` have rows.
    pub async fn chunk_hashes(
        &self,
        world_id: &str,
        coords: Vec<ChunkCoords>,
    ) -> Result<Vec<ChunkHashRecord>, MapDbError> {
        self.blocking(world_id, move |map| {
            let mut records = Vec::with_capacity(coords.len());
            for c in coords {
                if let Some(hash) = map.chunk_hash(c)? {
                    records.push(ChunkHashRecord::new(c, hash));
                }
            }
            Ok(records)
        })
        .await
    }

    pub async fn region_hashes(
        &self,
        world_id: &str,
        center: ChunkCoords,
        radius: u32,
    ) -> Result<Vec<ChunkHashRecord>, MapDbError> {
        self.blocking(world_id, move |map| map.region_hashes(center, radius))
            .await
    }

    /// Reads a full row. Each successful read refreshes the row's last-access time.
    pub async fn chunk_data(
        &self,
        world_id: &str,
        coords: ChunkCoords,
    ) -> Result<Option<StoredChunk>, MapDbError> {
        self.blocking(world_id, move |map| map.read_chunk(coords, unix_millis_now()))
            .await
    }

    /// Reads every stored row of `group`, refreshing their last-access times.
    pub async fn group_chunks(
        &self,
        world_id: &str,
        group: GroupCoords,
    ) -> Result<Vec<StoredChunk>, MapDbError> {
        self.blocking(world_id, move |map| {
            let now = unix_millis_now();
            let mut chunks = Vec::new();
            for record in map.group_hashes(group)? {
                if let Some(chunk) = map.read_chunk(record.coords, now)? {
                    chunks.push(chunk);
                }
            }
            Ok(chunks)
        })
        .await
    }

    pub async fn group_hashes(
        &self,
        world_id: &str,
        group: GroupCoords,
    ) -> Result<Vec<ChunkHashRecord>, MapDbError> {
        self.blocking(world_id, move |map| map.group_hashes(group)).await
    }

    pub async fn touch_chunks(&self, world_id: &str, coords: Vec<ChunkCoords>) -> Result<(), MapDbError> {
        self.blocking(world_id, move |map| map.touch_chunks(&coords, unix_millis_now()))
            .await
    }

    pub async fn all_hashes(&self, world_id: &str) -> Result<Vec<ChunkHashRecord>, MapDbError> {
        self.blocking(world_id, |map| map.all_hashes()).await
    }

    /// Explicit retention pass. Never called implicitly by sync.
    pub async fn purge_stale(&self, world_id: &str, max_age: Duration) -> Result<usize, MapDbError> {
        self.blocking(world_id, move |map| map.purge_stale(max_age, unix_millis_now()))
            .await
    }

    pub async fn write_block_colors(
        &self,
        world_id: &str,
        colors: BlockColorMap,
    ) -> Result<bool, MapDbError> {
        self.blocking(world_id, move |map| map.write_block_colors(&colors))
            .await
    }

    /// Color table, its revision and the reported map height, read together.
    pub async fn metadata(&self, world_id: &str) -> Result<MapDbMetadata, MapDbError> {
        self.blocking(world_id, |map| Ok(map.metadata())).await
    }

    pub async fn write_map_height(&self, world_id: &str, map_height: u16) -> Result<bool, MapDbError> {
        self.blocking(world_id, move |map| map.write_map_height(map_height))
            .await
    }

    pub async fn flush(&self) -> Result<(), MapDbError> {
        self.db.flush_async().await?;
        Ok(())
    }

    async fn blocking<T, F>(&self, world_id: &str, f: F) -> Result<T, MapDbError>
    where
        F: FnOnce(&MapDb) -> Result<T, MapDbError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        let world_id = world_id.to_owned();
        tokio::task::spawn_blocking(move || {
            let map = store.world(&world_id)?;
            f(&map)
        })
        .await
        .map_err(|e| MapDbError::Task(e.to_string()))?
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
