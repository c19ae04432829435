use super::MapDbError;

use terramap_core::bytes::{
    block_ids_from_bytes, block_ids_to_bytes, heights_from_bytes, heights_to_bytes,
};
use terramap_core::{ChunkCoords, ContentHash, RawChunkSummary, StoredChunk, CHUNK_AREA};

use rkyv::{AlignedVec, Archive, Deserialize, Serialize};
use sled::Tree;

pub fn open_chunk_tree(world_id: &str, db: &sled::Db) -> sled::Result<Tree> {
    db.open_tree(format!("{}-chunks", world_id))
}

pub fn open_hash_tree(world_id: &str, db: &sled::Db) -> sled::Result<Tree> {
    db.open_tree(format!("{}-hashes", world_id))
}

pub fn open_access_tree(world_id: &str, db: &sled::Db) -> sled::Result<Tree> {
    db.open_tree(format!("{}-access", world_id))
}

/// The value stored in the chunk tree. Surface arrays are LZ4-compressed little-endian bytes.
#[derive(Archive, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[archive(check_bytes)]
pub struct ChunkRecord {
    pub content_hash: String,
    pub heights_lz4: Vec<u8>,
    pub block_ids_lz4: Vec<u8>,
    pub extracted_at: u64,
    pub received_at: u64,
}

impl ChunkRecord {
    pub fn from_summary(summary: &RawChunkSummary, received_at: u64) -> Self {
        Self {
            content_hash: summary.content_hash.as_str().to_owned(),
            heights_lz4: lz4_flex::compress_prepend_size(&heights_to_bytes(&summary.heights)),
            block_ids_lz4: lz4_flex::compress_prepend_size(&block_ids_to_bytes(&summary.block_ids)),
            extracted_at: summary.extracted_at,
            received_at,
        }
    }

    pub fn encode(&self) -> Result<AlignedVec, MapDbError> {
        rkyv::to_bytes::<_, 256>(self).map_err(|e| MapDbError::Encode(format!("{:?}", e)))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MapDbError> {
        // sled values carry no alignment guarantee.
        let mut aligned = AlignedVec::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self>(&aligned).map_err(|e| MapDbError::Decode(format!("{:?}", e)))
    }

    pub fn into_stored(self, coords: ChunkCoords, last_accessed_at: u64) -> Result<StoredChunk, MapDbError> {
        let content_hash = ContentHash::from_hex(&self.content_hash)
            .ok_or_else(|| MapDbError::Decode(format!("bad content hash for {:?}", coords)))?;
        let heights = lz4_flex::decompress_size_prepended(&self.heights_lz4)
            .ok()
            .and_then(|b| heights_from_bytes(&b))
            .filter(|h| h.len() == CHUNK_AREA)
            .ok_or_else(|| MapDbError::Decode(format!("bad height map for {:?}", coords)))?;
        let block_ids = lz4_flex::decompress_size_prepended(&self.block_ids_lz4)
            .ok()
            .and_then(|b| block_ids_from_bytes(&b))
            .filter(|b| b.len() == CHUNK_AREA)
            .ok_or_else(|| MapDbError::Decode(format!("bad block id map for {:?}", coords)))?;
        Ok(StoredChunk {
            coords,
            content_hash,
            heights,
            block_ids,
            extracted_at: self.extracted_at,
            received_at: self.received_at,
            last_accessed_at,
        })
    }
}

pub fn encode_timestamp(millis: u64) -> [u8; 8] {
    millis.to_be_bytes()
}

pub fn decode_timestamp(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_survives_encoding_and_compresses_flat_chunks() {
        let mut heights = vec![64; CHUNK_AREA];
        heights[0] = u16::MAX;
        let mut ids = vec![7; CHUNK_AREA];
        ids[1] = i32::MIN;
        ids[2] = i32::MAX;
        let summary = RawChunkSummary::new(ChunkCoords::new(2, -3), heights, ids, 11);

        let record = ChunkRecord::from_summary(&summary, 22);
        assert!(record.heights_lz4.len() < CHUNK_AREA * 2 / 4);

        let bytes = record.encode().unwrap();
        let decoded = ChunkRecord::decode(&bytes).unwrap();
        assert_eq!(decoded, record);

        let stored = decoded.into_stored(summary.coords, 33).unwrap();
        assert_eq!(stored.heights, summary.heights);
        assert_eq!(stored.block_ids, summary.block_ids);
        assert_eq!(stored.content_hash, summary.content_hash);
        assert_eq!((stored.extracted_at, stored.received_at, stored.last_accessed_at), (11, 22, 33));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            ChunkRecord::decode(&[1, 2, 3]),
            Err(MapDbError::Decode(_))
        ));
    }
}
