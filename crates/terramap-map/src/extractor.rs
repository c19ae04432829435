use crate::world::{BlockDescriptor, ChunkSurface, WorldSource};
use crate::world_thread::WorldThread;

use terramap_core::{
    local_index, unix_millis_now, BlockColorMap, ChunkCoords, ChunkHashRecord, ColorCode,
    ContentHash, Material, RawChunkSummary,
};

use itertools::iproduct;
use std::sync::Arc;

/// Chunks copied per world-thread job when scanning many chunks. Keeps each job short so other reads can interleave.
const EXTRACT_BATCH: usize = 64;

/// The recorded surface at one world cell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeightSample {
    pub height: u16,
    pub block_id: i32,
    pub color_code: ColorCode,
}

/// World-side reader of chunk surfaces.
///
/// Every operation is marshaled through the [`WorldThread`]. Failures (world not loaded, queue full, timeouts, panics) are
/// logged and reported as `None` or an empty result, because extraction runs opportunistically against a live world and the
/// next sync pass retries anyway.
pub struct ChunkExtractor<W> {
    world: Arc<WorldThread<W>>,
}

impl<W> Clone for ChunkExtractor<W> {
    fn clone(&self) -> Self {
        Self {
            world: self.world.clone(),
        }
    }
}

impl<W: WorldSource> ChunkExtractor<W> {
    pub fn new(world: Arc<WorldThread<W>>) -> Self {
        Self { world }
    }

    pub fn is_available(&self) -> bool {
        self.world.is_available()
    }

    /// `None` if the chunk is not loaded.
    pub async fn extract_chunk(&self, coords: ChunkCoords) -> Option<RawChunkSummary> {
        let surface = self
            .read("extract chunk", move |w| w.chunk_surface(coords))
            .await??;
        summarize(coords, surface)
    }

    /// Summaries for each of `coords` that is loaded, in input order.
    pub async fn extract_chunks(&self, coords: &[ChunkCoords]) -> Vec<RawChunkSummary> {
        self.extract_batched(coords.iter().copied()).await
    }

    /// Hashes of every loaded chunk in the inclusive square `[center - radius, center + radius]`, x-major. Only the part of
    /// the square inside the world's bounding size is visited.
    pub async fn extract_region_hashes(
        &self,
        center: ChunkCoords,
        radius: u32,
    ) -> Vec<ChunkHashRecord> {
        let Some(size) = self.read("world size", |w| w.world_size()).await else {
            return Vec::new();
        };
        let [min, max] = ChunkCoords::square_bounds(center, radius);
        let [chunks_x, chunks_z] = size.in_chunks();
        let (x0, x1) = (min.x.max(0), max.x.min(chunks_x as i32 - 1));
        let (z0, z1) = (min.z.max(0), max.z.min(chunks_z as i32 - 1));
        if x0 > x1 || z0 > z1 {
            return Vec::new();
        }
        let coords = iproduct!(x0..=x1, z0..=z1).map(|(x, z)| ChunkCoords::new(x, z));
        self.hashes_of(coords).await
    }

    /// Hashes of every loaded chunk inside the world's bounding size, x-major.
    pub async fn extract_all_known_hashes(&self) -> Vec<ChunkHashRecord> {
        let Some(size) = self.read("world size", |w| w.world_size()).await else {
            return Vec::new();
        };
        let [chunks_x, chunks_z] = size.in_chunks();
        let coords = iproduct!(0..chunks_x as i32, 0..chunks_z as i32).map(|(x, z)| ChunkCoords::new(x, z));
        self.hashes_of(coords).await
    }

    pub async fn color_code_for_block(&self, block_id: i32) -> ColorCode {
        let block = self
            .read("block lookup", move |w| w.block(block_id))
            .await
            .flatten();
        resolve_color_code(block.as_ref())
    }

    /// Resolved color codes for every registered block.
    pub async fn block_color_map(&self) -> BlockColorMap {
        let blocks = self
            .read("block registry", |w| w.blocks())
            .await
            .unwrap_or_default();
        block_color_map(&blocks)
    }

    pub async fn map_height(&self) -> Option<u16> {
        self.read("map height", |w| w.map_height()).await
    }

    /// The surface at world cell `(x, z)`. `None` if the owning chunk is not loaded.
    pub async fn height_at(&self, x: i32, z: i32) -> Option<HeightSample> {
        let coords = ChunkCoords::containing_block(x, z);
        let [lx, lz] = coords.local_of_block(x, z);
        let (height, block_id, block) = self
            .read("height at position", move |w| {
                let surface = w.chunk_surface(coords)?;
                let i = local_index(lx, lz);
                let (height, block_id) = (*surface.heights.get(i)?, *surface.block_ids.get(i)?);
                Some((height, block_id, w.block(block_id)))
            })
            .await??;
        Some(HeightSample {
            height,
            block_id,
            color_code: resolve_color_code(block.as_ref()),
        })
    }

    async fn hashes_of(&self, coords: impl Iterator<Item = ChunkCoords> + Send) -> Vec<ChunkHashRecord> {
        self.extract_batched(coords)
            .await
            .into_iter()
            .map(|s| s.hash_record())
            .collect()
    }

    /// Copies surfaces [`EXTRACT_BATCH`] chunks per world-thread job, pulling coordinates from `coords` as it goes.
    async fn extract_batched(&self, mut coords: impl Iterator<Item = ChunkCoords> + Send) -> Vec<RawChunkSummary> {
        let mut summaries = Vec::new();
        loop {
            let batch: Vec<_> = coords.by_ref().take(EXTRACT_BATCH).collect();
            if batch.is_empty() {
                break;
            }
            let Some(surfaces) = self
                .read("extract chunk batch", move |w| copy_surfaces(w, batch))
                .await
            else {
                continue;
            };
            summaries.extend(
                surfaces
                    .into_iter()
                    .filter_map(|(coords, surface)| summarize(coords, surface)),
            );
        }
        summaries
    }

    async fn read<T, F>(&self, what: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut W) -> T + Send + 'static,
        T: Send + 'static,
    {
        if !self.world.is_available() {
            log::debug!("Skipping {}: world is not loaded", what);
            return None;
        }
        match self.world.run(f).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("World read failed ({}): {}", what, e);
                None
            }
        }
    }
}

fn copy_surfaces<W: WorldSource>(
    world: &W,
    coords: Vec<ChunkCoords>,
) -> Vec<(ChunkCoords, ChunkSurface)> {
    coords
        .into_iter()
        .filter_map(|c| world.chunk_surface(c).map(|s| (c, s)))
        .collect()
}

/// Hashing happens here, off the world thread.
fn summarize(coords: ChunkCoords, surface: ChunkSurface) -> Option<RawChunkSummary> {
    if !surface.is_well_formed() {
        log::warn!(
            "Chunk {:?} has a malformed surface ({} heights, {} block ids)",
            coords,
            surface.heights.len(),
            surface.block_ids.len()
        );
        return None;
    }
    let ChunkSurface { heights, block_ids } = surface;
    let content_hash = ContentHash::of_surface(&heights, &block_ids);
    Some(RawChunkSummary {
        coords,
        content_hash,
        heights,
        block_ids,
        extracted_at: unix_millis_now(),
    })
}

/// Two-level color resolution: the block's explicit override, then the surface-snow rule, then the material default.
/// Unknown blocks and materials without a default resolve to [`ColorCode::Land`].
pub fn resolve_color_code(block: Option<&BlockDescriptor>) -> ColorCode {
    let Some(block) = block else {
        return ColorCode::Land;
    };
    if let Some(code) = block.color_override {
        return code;
    }
    if is_surface_snow(block) {
        return ColorCode::Glacier;
    }
    block.material.default_color_code().unwrap_or(ColorCode::Land)
}

/// Snow blocks whose asset name says "snow" are the surface snow layer, which reads as glacier on the map.
fn is_surface_snow(block: &BlockDescriptor) -> bool {
    block.material == Material::Snow
        && block
            .path
            .rsplit('/')
            .next()
            .map_or(false, |name| name.to_ascii_lowercase().contains("snow"))
}

pub fn block_color_map(blocks: &[BlockDescriptor]) -> BlockColorMap {
    blocks
        .iter()
        .map(|b| (b.id, resolve_color_code(Some(b))))
        .collect()
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
    use crate::config::ExtractorConfig;
    use crate::world::{GridWorld, WorldSize};

    fn extractor(world: GridWorld) -> ChunkExtractor<GridWorld> {
        let thread = WorldThread::spawn(world, ExtractorConfig::default()).unwrap();
        ChunkExtractor::new(Arc::new(thread))
    }

    fn two_chunk_world() -> GridWorld {
        let mut world = GridWorld::new(WorldSize::new(96, 64), 256);
        world.insert_chunk(ChunkCoords::new(0, 0), ChunkSurface::filled(64, 7));
        world.insert_chunk(ChunkCoords::new(2, 1), ChunkSurface::filled(10, 3));
        world.register_block(BlockDescriptor::new(7, "blocks/tree/oak", Material::Leaves));
        world.register_block(BlockDescriptor::new(3, "blocks/terrain/snow", Material::Snow));
        world
    }

    #[tokio::test]
    async fn extract_loaded_chunk() {
        let extractor = extractor(two_chunk_world());
        let summary = extractor.extract_chunk(ChunkCoords::new(0, 0)).await.unwrap();
        assert_eq!(summary.heights, vec![64; terramap_core::CHUNK_AREA]);
        assert_eq!(
            summary.content_hash,
            ContentHash::of_surface(&summary.heights, &summary.block_ids)
        );
        assert!(extractor.extract_chunk(ChunkCoords::new(1, 0)).await.is_none());
    }

    #[tokio::test]
    async fn unavailable_world_yields_nothing() {
        let mut world = two_chunk_world();
        world.set_loaded(false);
        let extractor = extractor(world);
        assert!(!extractor.is_available());
        assert!(extractor.extract_chunk(ChunkCoords::new(0, 0)).await.is_none());
        assert!(extractor.extract_all_known_hashes().await.is_empty());
        assert!(extractor.height_at(0, 0).await.is_none());
    }

    #[tokio::test]
    async fn region_skips_unloaded_chunks() {
        let extractor = extractor(two_chunk_world());
        let hashes = extractor
            .extract_region_hashes(ChunkCoords::new(1, 1), 1)
            .await;
        let coords: Vec<_> = hashes.iter().map(|h| h.coords).collect();
        assert_eq!(coords, vec![ChunkCoords::new(0, 0), ChunkCoords::new(2, 1)]);

        let again = extractor
            .extract_region_hashes(ChunkCoords::new(1, 1), 1)
            .await;
        assert_eq!(hashes, again);
    }

    #[tokio::test]
    async fn region_is_cut_to_world_bounds() {
        let extractor = extractor(two_chunk_world());
        let everything = extractor
            .extract_region_hashes(ChunkCoords::new(0, 0), u32::MAX)
            .await;
        let coords: Vec<_> = everything.iter().map(|h| h.coords).collect();
        assert_eq!(coords, vec![ChunkCoords::new(0, 0), ChunkCoords::new(2, 1)]);

        let far = extractor
            .extract_region_hashes(ChunkCoords::new(i32::MAX, i32::MIN), 1)
            .await;
        assert!(far.is_empty());
        let corner = extractor
            .extract_region_hashes(ChunkCoords::new(-1, -1), 1)
            .await;
        assert_eq!(corner.len(), 1);
    }

    #[tokio::test]
    async fn map_height_is_read_from_the_world() {
        let extractor = extractor(two_chunk_world());
        assert_eq!(extractor.map_height().await, Some(256));
    }

    #[tokio::test]
    async fn all_known_hashes_cover_world_bounds() {
        let mut world = two_chunk_world();
        // Outside the 96x64 bounds, so never reported.
        world.insert_chunk(ChunkCoords::new(5, 5), ChunkSurface::filled(1, 1));
        let extractor = extractor(world);
        let hashes = extractor.extract_all_known_hashes().await;
        assert_eq!(hashes.len(), 2);
    }

    #[tokio::test]
    async fn height_at_resolves_color() {
        let extractor = extractor(two_chunk_world());
        let sample = extractor.height_at(5, 5).await.unwrap();
        assert_eq!(
            sample,
            HeightSample {
                height: 64,
                block_id: 7,
                color_code: ColorCode::Forest
            }
        );
        let snow = extractor.height_at(64 + 1, 32 + 1).await.unwrap();
        assert_eq!(snow.color_code, ColorCode::Glacier);
        assert!(extractor.height_at(-1, 0).await.is_none());
    }

    #[test]
    fn color_resolution_order() {
        let snow = BlockDescriptor::new(1, "blocks/terrain/Snow_Layer", Material::Snow);
        assert_eq!(resolve_color_code(Some(&snow)), ColorCode::Glacier);

        let packed = BlockDescriptor::new(2, "blocks/terrain/packed", Material::Snow);
        assert_eq!(resolve_color_code(Some(&packed)), ColorCode::Snow);

        let overridden = snow.clone().with_color(ColorCode::Lava);
        assert_eq!(resolve_color_code(Some(&overridden)), ColorCode::Lava);

        let cloth = BlockDescriptor::new(3, "blocks/deco/rug", Material::Fabric);
        assert_eq!(resolve_color_code(Some(&cloth)), ColorCode::Land);
        assert_eq!(resolve_color_code(None), ColorCode::Land);
    }

    #[tokio::test]
    async fn color_map_covers_registry() {
        let extractor = extractor(two_chunk_world());
        let colors = extractor.block_color_map().await;
        assert_eq!(colors.len(), 2);
        assert_eq!(colors.get(&7), Some(&ColorCode::Forest));
        assert_eq!(extractor.color_code_for_block(3).await, ColorCode::Glacier);
        assert_eq!(extractor.color_code_for_block(99).await, ColorCode::Land);
    }
}
