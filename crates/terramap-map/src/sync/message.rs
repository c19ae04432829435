use terramap_core::{BlockColorMap, ChunkCoords, ChunkHashRecord, ColorCode, RawChunkSummary};

use serde::{Deserialize, Serialize};

/// Which half of the pipeline a message comes from or is addressed to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The process that owns the live world and extracts chunks.
    World,
    /// The process that persists chunks and renders tiles.
    Storage,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::World => Self::Storage,
            Self::Storage => Self::World,
        }
    }
}

/// How much of the world a [`MapMessage::HashManifest`] describes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestScope {
    /// Every chunk the sender knows about. A full manifest replaces the receiver's picture of the sender.
    Full,
    /// Only the square of chunks within `radius` of chunk `(center_x, center_z)`.
    Region {
        center_x: i32,
        center_z: i32,
        radius: u32,
    },
}

impl ManifestScope {
    pub fn region(center: ChunkCoords, radius: u32) -> Self {
        Self::Region {
            center_x: center.x,
            center_z: center.z,
            radius,
        }
    }

    pub fn contains(&self, coords: ChunkCoords) -> bool {
        match *self {
            Self::Full => true,
            Self::Region {
                center_x,
                center_z,
                radius,
            } => {
                let r = radius as i64;
                (coords.x as i64 - center_x as i64).abs() <= r
                    && (coords.z as i64 - center_z as i64).abs() <= r
            }
        }
    }
}

/// Everything exchanged between the world side and the storage side. Every message names the world it concerns.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapMessage {
    /// One chunk's full surface, world to storage.
    ChunkData {
        world_id: String,
        summary: RawChunkSummary,
    },
    /// A set of chunk hashes. The receiver answers with whatever the sender is missing or holds stale.
    HashManifest {
        world_id: String,
        origin: Side,
        scope: ManifestScope,
        hashes: Vec<ChunkHashRecord>,
    },
    /// Storage asks the world side to run its bootstrap diff.
    SyncTrigger { world_id: String },
    /// Storage asks for specific chunks by coordinate.
    ChunkRequest {
        world_id: String,
        coords: Vec<ChunkCoords>,
    },
    /// The world's block id to color code table, world to storage.
    BlockColors {
        world_id: String,
        colors: Vec<(i32, ColorCode)>,
    },
    /// The world's build height, world to storage. Tiles shade heights relative to it.
    MapHeight { world_id: String, map_height: u16 },
}

impl MapMessage {
    pub fn world_id(&self) -> &str {
        match self {
            Self::ChunkData { world_id, .. }
            | Self::HashManifest { world_id, .. }
            | Self::SyncTrigger { world_id }
            | Self::ChunkRequest { world_id, .. }
            | Self::BlockColors { world_id, .. }
            | Self::MapHeight { world_id, .. } => world_id,
        }
    }

    /// The side expected to act on this message.
    pub fn destination(&self) -> Side {
        match self {
            Self::ChunkData { .. } | Self::BlockColors { .. } | Self::MapHeight { .. } => {
                Side::Storage
            }
            Self::HashManifest { origin, .. } => origin.opposite(),
            Self::SyncTrigger { .. } | Self::ChunkRequest { .. } => Side::World,
        }
    }

    pub fn block_colors(world_id: impl Into<String>, colors: &BlockColorMap) -> Self {
        let mut colors: Vec<_> = colors.iter().map(|(id, code)| (*id, *code)).collect();
        colors.sort_unstable_by_key(|(id, _)| *id);
        Self::BlockColors {
            world_id: world_id.into(),
            colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifests_travel_to_the_other_side() {
        let from_world = MapMessage::HashManifest {
            world_id: "w".into(),
            origin: Side::World,
            scope: ManifestScope::Full,
            hashes: vec![],
        };
        assert_eq!(from_world.destination(), Side::Storage);

        let from_storage = MapMessage::HashManifest {
            world_id: "w".into(),
            origin: Side::Storage,
            scope: ManifestScope::Full,
            hashes: vec![],
        };
        assert_eq!(from_storage.destination(), Side::World);
        assert_eq!(
            MapMessage::SyncTrigger { world_id: "w".into() }.destination(),
            Side::World
        );
    }

    #[test]
    fn region_scope_is_a_square() {
        let scope = ManifestScope::region(ChunkCoords::new(0, 0), 2);
        assert!(scope.contains(ChunkCoords::new(2, -2)));
        assert!(!scope.contains(ChunkCoords::new(3, 0)));
        assert!(ManifestScope::Full.contains(ChunkCoords::new(i32::MAX, i32::MIN)));

        let everything = ManifestScope::region(ChunkCoords::new(0, 0), u32::MAX);
        assert!(everything.contains(ChunkCoords::new(i32::MIN, i32::MAX)));
    }

    #[test]
    fn world_facts_go_to_storage() {
        let height = MapMessage::MapHeight {
            world_id: "w".into(),
            map_height: 512,
        };
        assert_eq!(height.destination(), Side::Storage);
        assert_eq!(height.world_id(), "w");
    }

    #[test]
    fn block_colors_are_sorted_by_id() {
        let mut map = BlockColorMap::default();
        map.insert(9, ColorCode::Water);
        map.insert(-1, ColorCode::Sand);
        map.insert(3, ColorCode::Forest);
        let MapMessage::BlockColors { colors, .. } = MapMessage::block_colors("w", &map) else {
            panic!("wrong variant");
        };
        assert_eq!(
            colors,
            vec![(-1, ColorCode::Sand), (3, ColorCode::Forest), (9, ColorCode::Water)]
        );
    }
}
