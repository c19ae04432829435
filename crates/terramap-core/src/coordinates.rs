use ndshape::{ConstShape, ConstShape2u32};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// The standard 2D array shape for chunk surfaces. Cell `(x, z)` lives at `z * CHUNK_SIZE + x`.
pub type ChunkShape = ConstShape2u32<32, 32>;
pub const CHUNK_SIZE: u32 = 32;
pub const CHUNK_SIZE_LOG2: u32 = 5;
pub const CHUNK_AREA: usize = ChunkShape::USIZE;
const_assert_eq!(CHUNK_AREA, (CHUNK_SIZE * CHUNK_SIZE) as usize);
const_assert_eq!(1 << CHUNK_SIZE_LOG2, CHUNK_SIZE);

/// Chunks per group along each axis.
pub const CHUNKS_PER_GROUP: i32 = 8;
/// Edge length of a grouped tile in pixels.
pub const GROUP_PIXELS: u32 = CHUNKS_PER_GROUP as u32 * CHUNK_SIZE;
pub const GROUP_AREA: usize = (GROUP_PIXELS * GROUP_PIXELS) as usize;
const_assert_eq!(GROUP_PIXELS, 256);

/// Linear index of a cell inside a chunk's surface arrays.
#[inline]
pub fn local_index(local_x: u32, local_z: u32) -> usize {
    debug_assert!(local_x < CHUNK_SIZE && local_z < CHUNK_SIZE);
    ChunkShape::linearize([local_x, local_z]) as usize
}

/// Inverse of [`local_index`].
#[inline]
pub fn local_coords(index: usize) -> [u32; 2] {
    ChunkShape::delinearize(index as u32)
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct ChunkCoords {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoords {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk owning the world cell at `(block_x, block_z)`. Negative coordinates round toward negative infinity.
    pub fn containing_block(block_x: i32, block_z: i32) -> Self {
        Self::new(block_x >> CHUNK_SIZE_LOG2, block_z >> CHUNK_SIZE_LOG2)
    }

    /// World cell coordinates of this chunk's minimum corner.
    pub fn min_block(self) -> [i32; 2] {
        [self.x << CHUNK_SIZE_LOG2, self.z << CHUNK_SIZE_LOG2]
    }

    /// Local cell coordinates of world cell `(block_x, block_z)`, which must be inside this chunk.
    pub fn local_of_block(self, block_x: i32, block_z: i32) -> [u32; 2] {
        let [min_x, min_z] = self.min_block();
        [(block_x - min_x) as u32, (block_z - min_z) as u32]
    }

    pub fn group(self) -> GroupCoords {
        GroupCoords::new(
            self.x.div_euclid(CHUNKS_PER_GROUP),
            self.z.div_euclid(CHUNKS_PER_GROUP),
        )
    }

    /// Inclusive `[min, max]` corners of the square `[center - radius, center + radius]`, cut off at the edges of the
    /// coordinate space.
    pub fn square_bounds(center: ChunkCoords, radius: u32) -> [ChunkCoords; 2] {
        let r = radius as i64;
        let lo = |c: i32| (c as i64 - r).max(i32::MIN as i64) as i32;
        let hi = |c: i32| (c as i64 + r).min(i32::MAX as i64) as i32;
        [
            ChunkCoords::new(lo(center.x), lo(center.z)),
            ChunkCoords::new(hi(center.x), hi(center.z)),
        ]
    }

    /// All chunks in the inclusive square `[center - radius, center + radius]` on both axes, x-major. Lazy, so callers
    /// can stop early on large squares.
    pub fn square_around(center: ChunkCoords, radius: u32) -> impl Iterator<Item = ChunkCoords> {
        let [min, max] = Self::square_bounds(center, radius);
        (min.x..=max.x).flat_map(move |x| (min.z..=max.z).map(move |z| ChunkCoords::new(x, z)))
    }
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct GroupCoords {
    pub x: i32,
    pub z: i32,
}

impl GroupCoords {
    /// Group coordinates whose chunks are all addressable with `i32` chunk coordinates.
    pub const RANGE: std::ops::RangeInclusive<i32> =
        (i32::MIN / CHUNKS_PER_GROUP)..=(i32::MAX / CHUNKS_PER_GROUP);

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Every group produced by [`ChunkCoords::group`] is in range. Other methods may overflow on groups that are not.
    pub fn is_in_range(self) -> bool {
        Self::RANGE.contains(&self.x) && Self::RANGE.contains(&self.z)
    }

    pub fn min_chunk(self) -> ChunkCoords {
        ChunkCoords::new(self.x * CHUNKS_PER_GROUP, self.z * CHUNKS_PER_GROUP)
    }

    pub fn max_chunk(self) -> ChunkCoords {
        let min = self.min_chunk();
        ChunkCoords::new(min.x + CHUNKS_PER_GROUP - 1, min.z + CHUNKS_PER_GROUP - 1)
    }

    pub fn contains(self, chunk: ChunkCoords) -> bool {
        chunk.group() == self
    }

    /// Every chunk covered by this group, x-major.
    pub fn chunks(self) -> impl Iterator<Item = ChunkCoords> {
        let min = self.min_chunk();
        (0..CHUNKS_PER_GROUP).flat_map(move |dx| {
            (0..CHUNKS_PER_GROUP).map(move |dz| ChunkCoords::new(min.x + dx, min.z + dz))
        })
    }

    /// Pixel offset of `chunk`'s minimum corner inside this group's tile.
    pub fn pixel_offset(self, chunk: ChunkCoords) -> [u32; 2] {
        debug_assert!(self.contains(chunk));
        let min = self.min_chunk();
        [
            (chunk.x - min.x) as u32 * CHUNK_SIZE,
            (chunk.z - min.z) as u32 * CHUNK_SIZE,
        ]
    }
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
    fn local_index_is_z_major() {
        assert_eq!(local_index(0, 0), 0);
        assert_eq!(local_index(5, 0), 5);
        assert_eq!(local_index(0, 1), 32);
        assert_eq!(local_index(3, 7), 7 * 32 + 3);
        assert_eq!(local_coords(7 * 32 + 3), [3, 7]);
    }

    #[test]
    fn negative_blocks_round_down() {
        assert_eq!(ChunkCoords::containing_block(-1, 0), ChunkCoords::new(-1, 0));
        assert_eq!(ChunkCoords::containing_block(-32, 31), ChunkCoords::new(-1, 0));
        assert_eq!(ChunkCoords::containing_block(-33, 32), ChunkCoords::new(-2, 1));
        assert_eq!(ChunkCoords::new(-1, 0).local_of_block(-1, 5), [31, 5]);
    }

    #[test]
    fn groups_use_floor_division() {
        assert_eq!(ChunkCoords::new(7, 8).group(), GroupCoords::new(0, 1));
        assert_eq!(ChunkCoords::new(-1, -8).group(), GroupCoords::new(-1, -1));
        assert_eq!(ChunkCoords::new(-9, 0).group(), GroupCoords::new(-2, 0));
    }

    #[test]
    fn group_covers_its_chunks() {
        let group = GroupCoords::new(-1, 2);
        let chunks: Vec<_> = group.chunks().collect();
        assert_eq!(chunks.len(), 64);
        assert!(chunks.iter().all(|c| group.contains(*c)));
        assert_eq!(group.pixel_offset(group.min_chunk()), [0, 0]);
        assert_eq!(group.pixel_offset(group.max_chunk()), [224, 224]);
    }

    #[test]
    fn square_around_is_inclusive() {
        let square: Vec<_> = ChunkCoords::square_around(ChunkCoords::new(0, 0), 1).collect();
        assert_eq!(square.len(), 9);
        assert_eq!(square[0], ChunkCoords::new(-1, -1));
        assert_eq!(square[8], ChunkCoords::new(1, 1));
    }

    #[test]
    fn square_stops_at_the_coordinate_limits() {
        let edge = ChunkCoords::new(i32::MAX, 0);
        let square: Vec<_> = ChunkCoords::square_around(edge, 1).collect();
        assert_eq!(square.len(), 6);
        assert_eq!(square[5], ChunkCoords::new(i32::MAX, 1));

        let [min, max] = ChunkCoords::square_bounds(ChunkCoords::new(0, 0), u32::MAX);
        assert_eq!(min, ChunkCoords::new(i32::MIN, i32::MIN));
        assert_eq!(max, ChunkCoords::new(i32::MAX, i32::MAX));

        // Huge squares are not materialized.
        let mut huge = ChunkCoords::square_around(ChunkCoords::new(0, 0), u32::MAX);
        assert_eq!(huge.next(), Some(ChunkCoords::new(i32::MIN, i32::MIN)));
    }

    #[test]
    fn extreme_groups_are_in_range() {
        for chunk in [
            ChunkCoords::new(i32::MIN, i32::MAX),
            ChunkCoords::new(i32::MAX, i32::MIN),
        ] {
            let group = chunk.group();
            assert!(group.is_in_range());
            assert!(group.contains(group.min_chunk()));
            assert!(group.contains(group.max_chunk()));
        }
        assert!(!GroupCoords::new(1 << 28, 0).is_in_range());
        assert!(!GroupCoords::new(0, i32::MIN).is_in_range());
    }
}
