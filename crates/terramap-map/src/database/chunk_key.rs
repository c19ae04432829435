use terramap_core::{ChunkCoords, GroupCoords, CHUNKS_PER_GROUP};

use std::ops::RangeInclusive;

/// Key of a chunk row in every per-world tree.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ChunkDbKey {
    pub coords: ChunkCoords,
}

impl ChunkDbKey {
    pub fn new(coords: ChunkCoords) -> Self {
        Self { coords }
    }

    /// We implement this manually so we have control over the [`Ord`] as interpreted by [`sled`].
    ///
    /// 8 bytes total per key: x then z, each big-endian with the sign bit flipped, so byte order equals numeric `(x, z)`
    /// order.
    pub fn into_sled_key(self) -> [u8; 8] {
        let mut bytes = [0; 8];
        bytes[..4].copy_from_slice(&flip_sign(self.coords.x).to_be_bytes());
        bytes[4..].copy_from_slice(&flip_sign(self.coords.z).to_be_bytes());
        bytes
    }

    /// Returns `None` if `bytes` is not an 8-byte key.
    pub fn from_sled_key(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8; 8] = bytes.try_into().ok()?;
        let x = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let z = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Some(Self::new(ChunkCoords::new(unflip_sign(x), unflip_sign(z))))
    }

    /// One key range per chunk column `x` of `group`. Together they cover exactly the group's chunks.
    pub fn group_ranges(group: GroupCoords) -> impl Iterator<Item = RangeInclusive<[u8; 8]>> {
        let min = group.min_chunk();
        (0..CHUNKS_PER_GROUP).map(move |dx| {
            let x = min.x + dx;
            let lo = Self::new(ChunkCoords::new(x, min.z)).into_sled_key();
            let hi = Self::new(ChunkCoords::new(x, min.z + CHUNKS_PER_GROUP - 1)).into_sled_key();
            lo..=hi
        })
    }
}

impl From<ChunkCoords> for ChunkDbKey {
    fn from(coords: ChunkCoords) -> Self {
        Self::new(coords)
    }
}

fn flip_sign(v: i32) -> u32 {
    (v as u32) ^ 0x8000_0000
}

fn unflip_sign(v: u32) -> i32 {
    (v ^ 0x8000_0000) as i32
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
    fn key_round_trip() {
        for coords in [
            ChunkCoords::new(0, 0),
            ChunkCoords::new(-1, 5),
            ChunkCoords::new(i32::MIN, i32::MAX),
        ] {
            let key = ChunkDbKey::new(coords);
            assert_eq!(ChunkDbKey::from_sled_key(&key.into_sled_key()), Some(key));
        }
        assert_eq!(ChunkDbKey::from_sled_key(&[0; 7]), None);
    }

    #[test]
    fn byte_order_matches_numeric_order() {
        let mut coords = vec![
            ChunkCoords::new(3, -2),
            ChunkCoords::new(-4, 9),
            ChunkCoords::new(0, 0),
            ChunkCoords::new(-4, -9),
            ChunkCoords::new(3, 1),
        ];
        let mut keys: Vec<_> = coords
            .iter()
            .map(|c| ChunkDbKey::new(*c).into_sled_key())
            .collect();
        coords.sort();
        keys.sort();
        let decoded: Vec<_> = keys
            .iter()
            .map(|k| ChunkDbKey::from_sled_key(k).unwrap().coords)
            .collect();
        assert_eq!(decoded, coords);
    }
}
