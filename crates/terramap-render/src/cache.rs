use terramap_core::{ChunkCoords, ChunkHashRecord, GroupCoords, SmallKeyHashMap};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Identifies the exact inputs a tile was rendered from: the contributing chunks' coordinates and hashes, the revision of
/// the block color table, and the world's map height.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TileSignature([u8; 32]);

impl TileSignature {
    pub fn new(hashes: &[ChunkHashRecord], color_revision: u64, map_height: u16) -> Self {
        let mut sorted: Vec<_> = hashes.iter().collect();
        sorted.sort_unstable_by_key(|r| r.coords);

        let mut hasher = Sha256::new();
        hasher.update(color_revision.to_le_bytes());
        hasher.update(map_height.to_le_bytes());
        for record in sorted {
            hasher.update(record.coords.x.to_le_bytes());
            hasher.update(record.coords.z.to_le_bytes());
            hasher.update(record.content_hash.as_str().as_bytes());
        }
        Self(hasher.finalize().into())
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct TileKey {
    world_id: String,
    group: GroupCoords,
}

struct CachedTile {
    signature: TileSignature,
    png: Arc<[u8]>,
    inserted: u64,
}

#[derive(Default)]
struct CacheState {
    tiles: SmallKeyHashMap<TileKey, CachedTile>,
    next_insert: u64,
}

/// Encoded tiles keyed by world and group.
///
/// A lookup only hits when the caller's current [`TileSignature`] matches the one the tile was rendered under, so a tile
/// can never outlive a change to any chunk it covers. Explicit invalidation just frees the memory sooner.
pub struct TileCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Default::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, world_id: &str, group: GroupCoords, signature: &TileSignature) -> Option<Arc<[u8]>> {
        let key = TileKey {
            world_id: world_id.to_owned(),
            group,
        };
        let state = self.state.lock();
        let tile = state.tiles.get(&key)?;
        (tile.signature == *signature).then(|| tile.png.clone())
    }

    pub fn insert(&self, world_id: &str, group: GroupCoords, signature: TileSignature, png: Arc<[u8]>) {
        let key = TileKey {
            world_id: world_id.to_owned(),
            group,
        };
        let mut state = self.state.lock();
        let inserted = state.next_insert;
        state.next_insert += 1;
        if !state.tiles.contains_key(&key) && state.tiles.len() >= self.capacity {
            evict_oldest(&mut state.tiles);
        }
        state.tiles.insert(
            key,
            CachedTile {
                signature,
                png,
                inserted,
            },
        );
    }

    /// Drops the tile covering `chunk`. Returns true if one was cached.
    pub fn invalidate_chunk(&self, world_id: &str, chunk: ChunkCoords) -> bool {
        let key = TileKey {
            world_id: world_id.to_owned(),
            group: chunk.group(),
        };
        let removed = self.state.lock().tiles.remove(&key).is_some();
        if removed {
            log::debug!("Invalidated tile {:?} of {}", key.group, world_id);
        }
        removed
    }

    /// Drops every tile of `world_id`. Returns how many were cached.
    pub fn invalidate_world(&self, world_id: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.tiles.len();
        state.tiles.retain(|key, _| key.world_id != world_id);
        before - state.tiles.len()
    }
}

fn evict_oldest(tiles: &mut SmallKeyHashMap<TileKey, CachedTile>) {
    let oldest = tiles
        .iter()
        .min_by_key(|(_, tile)| tile.inserted)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        tiles.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use terramap_core::ContentHash;

    fn record(x: i32, z: i32, seed: u16) -> ChunkHashRecord {
        ChunkHashRecord::new(ChunkCoords::new(x, z), ContentHash::of_surface(&[seed], &[0]))
    }

    fn png(byte: u8) -> Arc<[u8]> {
        Arc::from(vec![byte; 4])
    }

    #[test]
    fn signature_ignores_order_but_not_content() {
        let a = TileSignature::new(&[record(0, 0, 1), record(1, 0, 2)], 0, 256);
        let b = TileSignature::new(&[record(1, 0, 2), record(0, 0, 1)], 0, 256);
        assert_eq!(a, b);
        assert_ne!(a, TileSignature::new(&[record(0, 0, 1), record(1, 0, 3)], 0, 256));
        assert_ne!(a, TileSignature::new(&[record(0, 0, 1), record(1, 0, 2)], 1, 256));
        assert_ne!(a, TileSignature::new(&[record(0, 0, 1)], 0, 256));
        assert_ne!(a, TileSignature::new(&[record(0, 0, 1), record(1, 0, 2)], 0, 512));
    }

    #[test]
    fn stale_signature_misses() {
        let cache = TileCache::new(4);
        let group = GroupCoords::new(0, 0);
        let old = TileSignature::new(&[record(0, 0, 1)], 0, 256);
        let new = TileSignature::new(&[record(0, 0, 2)], 0, 256);
        cache.insert("w", group, old, png(1));
        assert_eq!(cache.get("w", group, &old).as_deref(), Some(&[1u8; 4][..]));
        assert!(cache.get("w", group, &new).is_none());
        assert!(cache.get("other", group, &old).is_none());
    }

    #[test]
    fn invalidation() {
        let cache = TileCache::new(8);
        let sig = TileSignature::new(&[], 0, 256);
        cache.insert("w", GroupCoords::new(0, 0), sig, png(1));
        cache.insert("w", GroupCoords::new(-1, 0), sig, png(2));
        cache.insert("v", GroupCoords::new(0, 0), sig, png(3));

        assert!(cache.invalidate_chunk("w", ChunkCoords::new(7, 7)));
        assert!(!cache.invalidate_chunk("w", ChunkCoords::new(7, 7)));
        assert!(cache.get("w", GroupCoords::new(-1, 0), &sig).is_some());

        assert_eq!(cache.invalidate_world("w"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_oldest_insert() {
        let cache = TileCache::new(2);
        let sig = TileSignature::new(&[], 0, 256);
        cache.insert("w", GroupCoords::new(0, 0), sig, png(1));
        cache.insert("w", GroupCoords::new(1, 0), sig, png(2));
        // Replacing an existing key never evicts.
        cache.insert("w", GroupCoords::new(0, 0), sig, png(3));
        assert_eq!(cache.len(), 2);

        cache.insert("w", GroupCoords::new(2, 0), sig, png(4));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("w", GroupCoords::new(1, 0), &sig).is_none());
        assert!(cache.get("w", GroupCoords::new(0, 0), &sig).is_some());
    }
}
