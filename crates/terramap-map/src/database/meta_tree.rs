use super::MapDbError;

use terramap_core::{BlockColorMap, ColorCode};

use rkyv::{AlignedVec, Archive, Deserialize, Serialize};
use sled::Tree;

const META_KEY: &str = "META";

#[derive(Archive, Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[archive(check_bytes)]
pub struct BlockColorEntry {
    pub block_id: i32,
    pub color_index: u8,
}

/// Per-world metadata that is not keyed by chunk.
#[derive(Archive, Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[archive(check_bytes)]
pub struct MapDbMetadata {
    /// Bumped whenever `block_colors` changes. Rendered tiles depend on it.
    pub color_revision: u64,
    /// Sorted by block id.
    pub block_colors: Vec<BlockColorEntry>,
    /// Build height reported by the world side. 0 until the first report.
    pub map_height: u16,
}

impl MapDbMetadata {
    pub fn block_color_map(&self) -> BlockColorMap {
        self.block_colors
            .iter()
            .filter_map(|e| ColorCode::from_index(e.color_index).map(|c| (e.block_id, c)))
            .collect()
    }

    pub fn reported_map_height(&self) -> Option<u16> {
        (self.map_height > 0).then_some(self.map_height)
    }

    fn entries_of(colors: &BlockColorMap) -> Vec<BlockColorEntry> {
        let mut entries: Vec<_> = colors
            .iter()
            .map(|(&block_id, code)| BlockColorEntry {
                block_id,
                color_index: code.index(),
            })
            .collect();
        entries.sort_by_key(|e| e.block_id);
        entries
    }
}

/// Mapping from `&str` to structured metadata, like [`MapDbMetadata`].
pub struct MetaTree {
    tree: Tree,
    // Zero-copy isn't super important for this tiny struct, so we just copy it for convenience.
    cached_meta: MapDbMetadata,
}

impl MetaTree {
    pub fn open(world_id: &str, db: &sled::Db) -> Result<Self, MapDbError> {
        let tree = db.open_tree(format!("{}-meta", world_id))?;
        let cached_meta = match tree.get(META_KEY)? {
            Some(bytes) => decode_meta(&bytes)?,
            None => {
                // First time opening this tree. Write the initial values.
                let default_meta = MapDbMetadata::default();
                tree.insert(META_KEY, encode_meta(&default_meta)?.as_slice())?;
                default_meta
            }
        };
        Ok(Self { tree, cached_meta })
    }

    pub fn cached_meta(&self) -> &MapDbMetadata {
        &self.cached_meta
    }

    pub fn write(&mut self, new_meta: MapDbMetadata) -> Result<(), MapDbError> {
        self.tree.insert(META_KEY, encode_meta(&new_meta)?.as_slice())?;
        self.cached_meta = new_meta;
        Ok(())
    }

    /// Replaces the block color map. Returns true (and bumps the revision) only if it differs from the stored one.
    pub fn write_block_colors(&mut self, colors: &BlockColorMap) -> Result<bool, MapDbError> {
        let entries = MapDbMetadata::entries_of(colors);
        if entries == self.cached_meta.block_colors {
            return Ok(false);
        }
        self.write(MapDbMetadata {
            color_revision: self.cached_meta.color_revision + 1,
            block_colors: entries,
            ..self.cached_meta.clone()
        })?;
        Ok(true)
    }

    /// Returns true if the stored map height changed.
    pub fn write_map_height(&mut self, map_height: u16) -> Result<bool, MapDbError> {
        if map_height == self.cached_meta.map_height {
            return Ok(false);
        }
        self.write(MapDbMetadata {
            map_height,
            ..self.cached_meta.clone()
        })?;
        Ok(true)
    }
}

fn encode_meta(meta: &MapDbMetadata) -> Result<AlignedVec, MapDbError> {
    rkyv::to_bytes::<_, 256>(meta).map_err(|e| MapDbError::Encode(format!("{:?}", e)))
}

fn decode_meta(bytes: &[u8]) -> Result<MapDbMetadata, MapDbError> {
    let mut aligned = AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    rkyv::from_bytes::<MapDbMetadata>(&aligned).map_err(|e| MapDbError::Decode(format!("{:?}", e)))
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
    fn open_write_and_reopen_meta_tree() {
        let db = sled::Config::default().temporary(true).open().unwrap();
        let mut tree = MetaTree::open("myworld", &db).unwrap();

        assert_eq!(tree.cached_meta(), &MapDbMetadata::default());

        let mut colors = BlockColorMap::default();
        colors.insert(7, ColorCode::Forest);
        colors.insert(-2, ColorCode::Lava);
        assert!(tree.write_block_colors(&colors).unwrap());
        assert!(!tree.write_block_colors(&colors).unwrap());
        assert_eq!(tree.cached_meta().color_revision, 1);

        // Re-open to make sure we can refresh the cached value.
        let tree = MetaTree::open("myworld", &db).unwrap();
        assert_eq!(tree.cached_meta().color_revision, 1);
        assert_eq!(tree.cached_meta().block_color_map(), colors);
    }

    #[test]
    fn map_height_survives_color_writes() {
        let db = sled::Config::default().temporary(true).open().unwrap();
        let mut tree = MetaTree::open("myworld", &db).unwrap();
        assert_eq!(tree.cached_meta().reported_map_height(), None);

        assert!(tree.write_map_height(512).unwrap());
        assert!(!tree.write_map_height(512).unwrap());

        let mut colors = BlockColorMap::default();
        colors.insert(1, ColorCode::Sand);
        assert!(tree.write_block_colors(&colors).unwrap());

        let tree = MetaTree::open("myworld", &db).unwrap();
        assert_eq!(tree.cached_meta().reported_map_height(), Some(512));
        assert_eq!(tree.cached_meta().color_revision, 1);
    }
}
