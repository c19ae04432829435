mod chunk_key;
mod chunk_tree;
mod meta_tree;

pub use chunk_key::ChunkDbKey;
pub use chunk_tree::ChunkRecord;
pub use meta_tree::{BlockColorEntry, MapDbMetadata};

use chunk_tree::{decode_timestamp, encode_timestamp, open_access_tree, open_chunk_tree, open_hash_tree};
use meta_tree::MetaTree;

use terramap_core::{
    BlockColorMap, ChunkCoords, ChunkHashRecord, ContentHash, GroupCoords, RawChunkSummary,
    StoredChunk, CHUNK_AREA,
};

use parking_lot::Mutex;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{IVec, Transactional, Tree};
use std::fmt;
use std::time::Duration;

/// Regions covering at most this many chunks are read by key. Larger ones scan the hash tree instead.
const REGION_LOOKUP_LIMIT: u64 = 4096;

#[derive(Debug)]
pub enum MapDbError {
    Sled(sled::Error),
    Encode(String),
    Decode(String),
    /// An incoming chunk violates the summary invariants.
    InvalidChunk(String),
    /// The blocking task running a database call failed.
    Task(String),
}

impl fmt::Display for MapDbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapDbError::Sled(e) => write!(f, "sled: {}", e),
            MapDbError::Encode(e) => write!(f, "failed to encode record: {}", e),
            MapDbError::Decode(e) => write!(f, "failed to decode record: {}", e),
            MapDbError::InvalidChunk(e) => write!(f, "invalid chunk: {}", e),
            MapDbError::Task(e) => write!(f, "database task failed: {}", e),
        }
    }
}

impl std::error::Error for MapDbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapDbError::Sled(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sled::Error> for MapDbError {
    fn from(e: sled::Error) -> Self {
        MapDbError::Sled(e)
    }
}

impl From<TransactionError<MapDbError>> for MapDbError {
    fn from(e: TransactionError<MapDbError>) -> Self {
        match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => MapDbError::Sled(e),
        }
    }
}

/// # Map Database
///
/// The storage side's persistent copy of one world's chunk summaries. Every row is keyed by [`ChunkDbKey`].
///
/// ## Implementation
///
/// All data is stored in four [`sled::Tree`]s named after the world.
///
/// ### Hash Tree
///
/// Only the content hash of each row. This is what manifests are built from and what the store short-circuit compares
/// against, so neither needs to decode a full record.
///
/// ### Chunk Tree
///
/// The full [`ChunkRecord`] with compressed surface arrays.
///
/// ### Access Tree
///
/// The last time each row was received or read for rendering, used by [`MapDb::purge_stale`]. Kept apart from the record so
/// a read only rewrites 8 bytes.
///
/// ### Meta Tree
///
/// Per-world [`MapDbMetadata`]: the block color map and the world's reported map height.
///
/// A row is written to the first three trees in a single transaction, which makes the compare-and-replace on the stored hash
/// atomic per row.
pub struct MapDb {
    world_id: String,
    hash_tree: Tree,
    chunk_tree: Tree,
    access_tree: Tree,
    meta_tree: Mutex<MetaTree>,
}

impl MapDb {
    pub fn open(db: &sled::Db, world_id: &str) -> Result<Self, MapDbError> {
        Ok(Self {
            world_id: world_id.to_owned(),
            hash_tree: open_hash_tree(world_id, db)?,
            chunk_tree: open_chunk_tree(world_id, db)?,
            access_tree: open_access_tree(world_id, db)?,
            meta_tree: Mutex::new(MetaTree::open(world_id, db)?),
        })
    }

    pub fn world_id(&self) -> &str {
        &self.world_id
    }

    /// Inserts or replaces the row for `summary.coords`. Returns false without writing anything if the stored hash already
    /// equals the incoming one.
    pub fn store_chunk(&self, summary: &RawChunkSummary, now: u64) -> Result<bool, MapDbError> {
        validate_summary(summary)?;

        let key = ChunkDbKey::from(summary.coords).into_sled_key();
        let hash_bytes = summary.content_hash.as_str().as_bytes();
        let record_bytes = ChunkRecord::from_summary(summary, now).encode()?;
        let access_bytes = encode_timestamp(now);

        let changed = (&self.hash_tree, &self.chunk_tree, &self.access_tree).transaction(
            |(hash_txn, chunk_txn, access_txn)| {
                if let Some(old_hash) = hash_txn.get(key)? {
                    if old_hash.as_ref() == hash_bytes {
                        return Ok(false);
                    }
                }
                hash_txn.insert(&key[..], hash_bytes)?;
                chunk_txn.insert(&key[..], record_bytes.as_slice())?;
                access_txn.insert(&key[..], &access_bytes[..])?;
                Ok::<_, ConflictableTransactionError<MapDbError>>(true)
            },
        )?;

        if changed {
            log::debug!("[{}] Stored chunk {:?}", self.world_id, summary.coords);
        } else {
            log::debug!("[{}] Chunk {:?} unchanged", self.world_id, summary.coords);
        }
        Ok(changed)
    }

    pub fn chunk_hash(&self, coords: ChunkCoords) -> Result<Option<ContentHash>, MapDbError> {
        let key = ChunkDbKey::from(coords).into_sled_key();
        self.hash_tree
            .get(key)?
            .map(|bytes| decode_hash(coords, &bytes))
            .transpose()
    }

    /// Reads the full row and refreshes its last-access time to `now`.
    pub fn read_chunk(&self, coords: ChunkCoords, now: u64) -> Result<Option<StoredChunk>, MapDbError> {
        let key = ChunkDbKey::from(coords).into_sled_key();
        let access_bytes = encode_timestamp(now);
        let record = (&self.chunk_tree, &self.access_tree).transaction(|(chunk_txn, access_txn)| {
            let record = chunk_txn.get(key)?;
            if record.is_some() {
                access_txn.insert(&key[..], &access_bytes[..])?;
            }
            Ok::<_, ConflictableTransactionError<MapDbError>>(record)
        })?;
        record
            .map(|bytes| ChunkRecord::decode(&bytes)?.into_stored(coords, now))
            .transpose()
    }

    /// Refreshes the last-access time of whichever of `coords` exist.
    pub fn touch_chunks(&self, coords: &[ChunkCoords], now: u64) -> Result<(), MapDbError> {
        let access_bytes = encode_timestamp(now);
        for &c in coords {
            let key = ChunkDbKey::from(c).into_sled_key();
            (&self.hash_tree, &self.access_tree).transaction(|(hash_txn, access_txn)| {
                if hash_txn.get(key)?.is_some() {
                    access_txn.insert(&key[..], &access_bytes[..])?;
                }
                Ok::<_, ConflictableTransactionError<MapDbError>>(())
            })?;
        }
        Ok(())
    }

    pub fn all_hashes(&self) -> Result<Vec<ChunkHashRecord>, MapDbError> {
        self.hash_tree
            .iter()
            .map(|entry| {
                let (key, value) = entry?;
                decode_hash_entry(&key, &value)
            })
            .collect()
    }

    /// Hashes of the stored chunks in the inclusive square `[center - radius, center + radius]`.
    pub fn region_hashes(&self, center: ChunkCoords, radius: u32) -> Result<Vec<ChunkHashRecord>, MapDbError> {
        let [min, max] = ChunkCoords::square_bounds(center, radius);
        let area = (max.x as i64 - min.x as i64 + 1) as u64 * (max.z as i64 - min.z as i64 + 1) as u64;
        if area <= REGION_LOOKUP_LIMIT {
            let mut records = Vec::new();
            for c in ChunkCoords::square_around(center, radius) {
                if let Some(hash) = self.chunk_hash(c)? {
                    records.push(ChunkHashRecord::new(c, hash));
                }
            }
            return Ok(records);
        }
        let mut records = self.all_hashes()?;
        records.retain(|r| (min.x..=max.x).contains(&r.coords.x) && (min.z..=max.z).contains(&r.coords.z));
        Ok(records)
    }

    /// Hashes of the stored chunks covered by `group`, sorted by `(x, z)`.
    pub fn group_hashes(&self, group: GroupCoords) -> Result<Vec<ChunkHashRecord>, MapDbError> {
        let mut records = Vec::new();
        for range in ChunkDbKey::group_ranges(group) {
            for entry in self.hash_tree.range(range) {
                let (key, value) = entry?;
                records.push(decode_hash_entry(&key, &value)?);
            }
        }
        Ok(records)
    }

    /// Deletes every row whose last access (or receipt, if never read) is older than `max_age` before `now`. Returns the
    /// number of rows removed.
    pub fn purge_stale(&self, max_age: Duration, now: u64) -> Result<usize, MapDbError> {
        let cutoff = now.saturating_sub(max_age.as_millis() as u64);
        let mut stale = Vec::new();
        for entry in self.hash_tree.iter() {
            let (key, _) = entry?;
            let last_access = match self.access_tree.get(&key)? {
                Some(bytes) => decode_timestamp(&bytes),
                None => None,
            };
            let last_access = match last_access {
                Some(t) => t,
                None => match self.chunk_tree.get(&key)? {
                    Some(bytes) => ChunkRecord::decode(&bytes)?.received_at,
                    None => 0,
                },
            };
            if last_access < cutoff {
                stale.push((key, last_access));
            }
        }

        let mut removed = 0;
        for (key, seen_access) in stale {
            let did_remove = (&self.hash_tree, &self.chunk_tree, &self.access_tree).transaction(
                |(hash_txn, chunk_txn, access_txn)| {
                    // The row may have been re-stored or read since the scan.
                    let current = access_txn.get(&key)?.and_then(|b| decode_timestamp(&b));
                    if current.map_or(false, |t| t != seen_access) {
                        return Ok(false);
                    }
                    let existed = hash_txn.remove(&key)?.is_some();
                    chunk_txn.remove(&key)?;
                    access_txn.remove(&key)?;
                    Ok::<_, ConflictableTransactionError<MapDbError>>(existed)
                },
            )?;
            if did_remove {
                removed += 1;
            }
        }

        if removed > 0 {
            log::info!("[{}] Purged {} stale chunks", self.world_id, removed);
        }
        Ok(removed)
    }

    pub fn metadata(&self) -> MapDbMetadata {
        self.meta_tree.lock().cached_meta().clone()
    }

    /// Returns true if the stored color map changed.
    pub fn write_block_colors(&self, colors: &BlockColorMap) -> Result<bool, MapDbError> {
        self.meta_tree.lock().write_block_colors(colors)
    }

    /// Returns true if the stored map height changed.
    pub fn write_map_height(&self, map_height: u16) -> Result<bool, MapDbError> {
        self.meta_tree.lock().write_map_height(map_height)
    }
}

fn validate_summary(summary: &RawChunkSummary) -> Result<(), MapDbError> {
    if summary.heights.len() != CHUNK_AREA || summary.block_ids.len() != CHUNK_AREA {
        return Err(MapDbError::InvalidChunk(format!(
            "{:?} has {} heights and {} block ids",
            summary.coords,
            summary.heights.len(),
            summary.block_ids.len()
        )));
    }
    if ContentHash::of_surface(&summary.heights, &summary.block_ids) != summary.content_hash {
        return Err(MapDbError::InvalidChunk(format!(
            "{:?} content hash does not match its surface",
            summary.coords
        )));
    }
    Ok(())
}

fn decode_hash(coords: ChunkCoords, bytes: &[u8]) -> Result<ContentHash, MapDbError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(ContentHash::from_hex)
        .ok_or_else(|| MapDbError::Decode(format!("bad content hash for {:?}", coords)))
}

fn decode_hash_entry(key: &IVec, value: &IVec) -> Result<ChunkHashRecord, MapDbError> {
    let coords = ChunkDbKey::from_sled_key(key)
        .ok_or_else(|| MapDbError::Decode(format!("bad chunk key {:?}", key)))?
        .coords;
    Ok(ChunkHashRecord::new(coords, decode_hash(coords, value)?))
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
