use super::{BlockDescriptor, ChunkSurface, WorldSize, WorldSource};

use terramap_core::{local_index, ChunkCoords, SmallKeyHashMap};

/// An in-memory [`WorldSource`] made of explicitly inserted chunks.
#[derive(Clone, Debug)]
pub struct GridWorld {
    loaded: bool,
    size: WorldSize,
    map_height: u16,
    chunks: SmallKeyHashMap<ChunkCoords, ChunkSurface>,
    blocks: SmallKeyHashMap<i32, BlockDescriptor>,
}

impl GridWorld {
    pub fn new(size: WorldSize, map_height: u16) -> Self {
        Self {
            loaded: true,
            size,
            map_height,
            chunks: Default::default(),
            blocks: Default::default(),
        }
    }

    /// Loads every chunk inside `size`, sampling `(height, block_id)` for each world cell from `f`.
    pub fn generate(
        size: WorldSize,
        map_height: u16,
        mut f: impl FnMut(i32, i32) -> (u16, i32),
    ) -> Self {
        let mut world = Self::new(size, map_height);
        let [chunks_x, chunks_z] = size.in_chunks();
        for cx in 0..chunks_x as i32 {
            for cz in 0..chunks_z as i32 {
                let coords = ChunkCoords::new(cx, cz);
                let [min_x, min_z] = coords.min_block();
                let mut surface = ChunkSurface::filled(0, 0);
                for (i, (h, id)) in surface
                    .heights
                    .iter_mut()
                    .zip(surface.block_ids.iter_mut())
                    .enumerate()
                {
                    let [lx, lz] = terramap_core::local_coords(i);
                    let (height, block_id) = f(min_x + lx as i32, min_z + lz as i32);
                    *h = height;
                    *id = block_id;
                }
                world.chunks.insert(coords, surface);
            }
        }
        world
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    pub fn register_block(&mut self, block: BlockDescriptor) {
        self.blocks.insert(block.id, block);
    }

    pub fn insert_chunk(&mut self, coords: ChunkCoords, surface: ChunkSurface) {
        self.chunks.insert(coords, surface);
    }

    pub fn unload_chunk(&mut self, coords: ChunkCoords) -> Option<ChunkSurface> {
        self.chunks.remove(&coords)
    }

    /// Edits one cell. Returns false if the owning chunk is not loaded.
    pub fn set_cell(&mut self, block_x: i32, block_z: i32, height: u16, block_id: i32) -> bool {
        let coords = ChunkCoords::containing_block(block_x, block_z);
        let Some(surface) = self.chunks.get_mut(&coords) else {
            return false;
        };
        let [lx, lz] = coords.local_of_block(block_x, block_z);
        let i = local_index(lx, lz);
        surface.heights[i] = height;
        surface.block_ids[i] = block_id;
        true
    }
}

impl WorldSource for GridWorld {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn world_size(&self) -> WorldSize {
        self.size
    }

    fn map_height(&self) -> u16 {
        self.map_height
    }

    fn chunk_surface(&self, coords: ChunkCoords) -> Option<ChunkSurface> {
        self.chunks.get(&coords).cloned()
    }

    fn block(&self, block_id: i32) -> Option<BlockDescriptor> {
        self.blocks.get(&block_id).cloned()
    }

    fn blocks(&self) -> Vec<BlockDescriptor> {
        let mut blocks: Vec<_> = self.blocks.values().cloned().collect();
        blocks.sort_by_key(|b| b.id);
        blocks
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
    fn generate_covers_partial_chunks() {
        let world = GridWorld::generate(WorldSize::new(40, 32), 128, |x, z| ((x + z) as u16, 1));
        assert!(world.chunk_surface(ChunkCoords::new(0, 0)).is_some());
        assert!(world.chunk_surface(ChunkCoords::new(1, 0)).is_some());
        assert!(world.chunk_surface(ChunkCoords::new(0, 1)).is_none());

        let surface = world.chunk_surface(ChunkCoords::new(1, 0)).unwrap();
        assert_eq!(surface.heights[local_index(2, 3)], 32 + 2 + 3);
    }

    #[test]
    fn set_cell_only_touches_loaded_chunks() {
        let mut world = GridWorld::new(WorldSize::new(64, 64), 128);
        world.insert_chunk(ChunkCoords::new(0, 0), ChunkSurface::filled(1, 1));
        assert!(world.set_cell(5, 6, 90, 3));
        assert!(!world.set_cell(40, 6, 90, 3));
        let surface = world.chunk_surface(ChunkCoords::new(0, 0)).unwrap();
        assert_eq!(surface.heights[local_index(5, 6)], 90);
        assert_eq!(surface.block_ids[local_index(5, 6)], 3);
    }
}
