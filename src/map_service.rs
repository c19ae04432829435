use terramap_core::{BlockColorMap, ChunkHashRecord, GroupCoords, RawChunkSummary};
use terramap_map::{ChunkStore, MapDbError};
use terramap_render::{fog_png, render_grouped_tile, RenderConfig, TileCache, TileSignature};

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Storage-side owner of chunk rows and rendered tiles.
///
/// Every write that reports a change goes through here so the tile cache hears about it. Tile lookups are additionally
/// guarded by a [`TileSignature`] over the group's current hashes, so a cached tile is never served after any of its
/// chunks changed, even if an invalidation races with a render.
pub struct MapService {
    store: ChunkStore,
    tiles: TileCache,
    render: RenderConfig,
    fog: Arc<[u8]>,
}

impl MapService {
    pub fn new(store: ChunkStore, render: RenderConfig) -> anyhow::Result<Self> {
        let fog = Arc::from(fog_png().context("Failed to encode fog tile")?);
        Ok(Self {
            store,
            tiles: TileCache::new(render.tile_cache_capacity),
            render,
            fog,
        })
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn tiles(&self) -> &TileCache {
        &self.tiles
    }

    /// The encoded fog-of-war tile served for groups without data.
    pub fn fog_tile(&self) -> Arc<[u8]> {
        self.fog.clone()
    }

    /// Stores one chunk, invalidating its tile if the row changed.
    pub async fn store_chunk(&self, world_id: &str, summary: RawChunkSummary) -> Result<bool, MapDbError> {
        let coords = summary.coords;
        let changed = self.store.store_chunk(world_id, summary).await?;
        if changed {
            self.tiles.invalidate_chunk(world_id, coords);
            log::debug!("Stored chunk {:?} of {}", coords, world_id);
        } else {
            log::debug!("Chunk {:?} of {} unchanged", coords, world_id);
        }
        Ok(changed)
    }

    /// Replaces the world's block color table. A change invalidates every tile of the world.
    pub async fn write_block_colors(&self, world_id: &str, colors: BlockColorMap) -> Result<bool, MapDbError> {
        let changed = self.store.write_block_colors(world_id, colors).await?;
        if changed {
            let dropped = self.tiles.invalidate_world(world_id);
            log::info!("Block colors of {} changed, dropped {} tiles", world_id, dropped);
        }
        Ok(changed)
    }

    /// Records the world's build height. A change invalidates every tile of the world.
    pub async fn write_map_height(&self, world_id: &str, map_height: u16) -> Result<bool, MapDbError> {
        let changed = self.store.write_map_height(world_id, map_height).await?;
        if changed {
            let dropped = self.tiles.invalidate_world(world_id);
            log::info!("Map height of {} is now {}, dropped {} tiles", world_id, map_height, dropped);
        }
        Ok(changed)
    }

    /// The PNG tile for `group`, rendering it if the cached copy is missing or stale. Groups without any stored chunk get
    /// the fog tile.
    pub async fn tile(&self, world_id: &str, group: GroupCoords) -> anyhow::Result<Arc<[u8]>> {
        anyhow::ensure!(group.is_in_range(), "Tile group {:?} is out of range", group);

        let hashes = self.store.group_hashes(world_id, group).await?;
        if hashes.is_empty() {
            return Ok(self.fog_tile());
        }
        let meta = self.store.metadata(world_id).await?;
        let (color_revision, colors) = (meta.color_revision, meta.block_color_map());
        let render = self.render.for_world(meta.reported_map_height());

        let current = TileSignature::new(&hashes, color_revision, render.map_height);
        if let Some(png) = self.tiles.get(world_id, group, &current) {
            log::debug!("Tile {:?} of {} cached", group, world_id);
            let coords = hashes.into_iter().map(|r| r.coords).collect();
            self.store.touch_chunks(world_id, coords).await?;
            return Ok(png);
        }

        let chunks = self.store.group_chunks(world_id, group).await?;
        // Sign with what was actually read, which may be newer than `hashes`.
        let records: Vec<ChunkHashRecord> = chunks.iter().map(|c| c.hash_record()).collect();
        let signature = TileSignature::new(&records, color_revision, render.map_height);

        let png = tokio::task::spawn_blocking(move || render_grouped_tile(group, &chunks, &colors, &render))
            .await
            .context("Tile render task failed")?
            .with_context(|| format!("Failed to encode tile {:?} of {}", group, world_id))?;

        let Some(png) = png else {
            // Rows were purged between reading hashes and reading chunks.
            return Ok(self.fog_tile());
        };
        let png: Arc<[u8]> = Arc::from(png);
        self.tiles.insert(world_id, group, signature, png.clone());
        log::debug!("Rendered tile {:?} of {} from {} chunks", group, world_id, records.len());
        Ok(png)
    }

    /// Removes rows not read within `max_age` and the world's cached tiles.
    pub async fn purge_stale(&self, world_id: &str, max_age: Duration) -> Result<usize, MapDbError> {
        let purged = self.store.purge_stale(world_id, max_age).await?;
        if purged > 0 {
            self.tiles.invalidate_world(world_id);
        }
        Ok(purged)
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

    use terramap_core::{ChunkCoords, ColorCode, CHUNK_AREA};
    use terramap_render::{apply_brightness, height_factor, image};

    fn service() -> MapService {
        MapService::new(ChunkStore::temporary().unwrap(), RenderConfig::default()).unwrap()
    }

    fn summary(x: i32, z: i32, height: u16, block_id: i32) -> RawChunkSummary {
        RawChunkSummary::new(
            ChunkCoords::new(x, z),
            vec![height; CHUNK_AREA],
            vec![block_id; CHUNK_AREA],
            1,
        )
    }

    #[tokio::test]
    async fn unknown_group_is_fog() {
        let service = service();
        let tile = service.tile("w", GroupCoords::new(5, 5)).await.unwrap();
        assert_eq!(&*tile, fog_png().unwrap());
    }

    #[tokio::test]
    async fn changed_chunk_is_never_served_stale() {
        let service = service();
        let group = GroupCoords::new(0, 0);
        assert!(service.store_chunk("w", summary(1, 1, 100, 1)).await.unwrap());

        let first = service.tile("w", group).await.unwrap();
        let again = service.tile("w", group).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        // Identical data keeps the cached tile.
        assert!(!service.store_chunk("w", summary(1, 1, 100, 1)).await.unwrap());
        assert_eq!(service.tiles().len(), 1);

        assert!(service.store_chunk("w", summary(1, 1, 200, 1)).await.unwrap());
        assert!(service.tiles().is_empty());
        let changed = service.tile("w", group).await.unwrap();
        assert_ne!(first, changed);
    }

    #[tokio::test]
    async fn color_change_rerenders() {
        let service = service();
        let group = GroupCoords::new(0, 0);
        service.store_chunk("w", summary(0, 0, 128, 7)).await.unwrap();
        let land = service.tile("w", group).await.unwrap();

        let mut colors = BlockColorMap::default();
        colors.insert(7, ColorCode::Lava);
        assert!(service.write_block_colors("w", colors).await.unwrap());
        let lava = service.tile("w", group).await.unwrap();
        assert_ne!(land, lava);
    }

    #[tokio::test]
    async fn out_of_range_group_is_rejected() {
        let service = service();
        assert!(service.tile("w", GroupCoords::new(i32::MAX, 0)).await.is_err());
        assert!(service.tile("w", GroupCoords::new(0, -(1 << 29))).await.is_err());

        let edge = ChunkCoords::new(i32::MAX, i32::MIN);
        service.store_chunk("w", summary(edge.x, edge.z, 10, 1)).await.unwrap();
        let tile = service.tile("w", edge.group()).await.unwrap();
        assert_ne!(&*tile, fog_png().unwrap());
    }

    #[tokio::test]
    async fn tiles_shade_against_the_world_height() {
        let service = service();
        let group = GroupCoords::new(0, 0);
        service.store_chunk("w", summary(0, 0, 256, 7)).await.unwrap();
        let mut colors = BlockColorMap::default();
        colors.insert(7, ColorCode::Forest);
        service.write_block_colors("w", colors).await.unwrap();

        let pixel = |png: &[u8]| {
            let [r, g, b, a] = image::load_from_memory(png).unwrap().to_rgba8().get_pixel(16, 16).0;
            u32::from_be_bytes([a, r, g, b])
        };
        let assumed = service.tile("w", group).await.unwrap();
        assert_eq!(
            pixel(&assumed),
            apply_brightness(ColorCode::Forest.argb(), height_factor(256, 256))
        );

        assert!(service.write_map_height("w", 512).await.unwrap());
        assert!(service.tiles().is_empty());
        assert!(!service.write_map_height("w", 512).await.unwrap());
        let reported = service.tile("w", group).await.unwrap();
        assert_eq!(pixel(&reported), ColorCode::Forest.argb());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_stores_and_renders_settle_on_the_latest_rows() {
        let service = Arc::new(service());
        let group = GroupCoords::new(0, 0);
        let mut tasks = Vec::new();
        for round in 0..12u16 {
            let writer = service.clone();
            tasks.push(tokio::spawn(async move {
                for (x, z) in [(0, 0), (3, 4), (7, 7)] {
                    writer
                        .store_chunk("w", summary(x, z, 40 + round * 5 + x as u16, 1))
                        .await
                        .unwrap();
                }
            }));
            let reader = service.clone();
            tasks.push(tokio::spawn(async move {
                reader.tile("w", group).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let served = service.tile("w", group).await.unwrap();
        let chunks = service.store().group_chunks("w", group).await.unwrap();
        assert_eq!(chunks.len(), 3);
        let colors = service.store().metadata("w").await.unwrap().block_color_map();
        let expected = render_grouped_tile(group, &chunks, &colors, &RenderConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(&*served, expected.as_slice());
        assert!(Arc::ptr_eq(&served, &service.tile("w", group).await.unwrap()));
    }

    #[tokio::test]
    async fn purge_drops_rows_and_tiles() {
        let service = service();
        service.store_chunk("w", summary(0, 0, 128, 7)).await.unwrap();
        service.tile("w", GroupCoords::new(0, 0)).await.unwrap();

        assert_eq!(service.purge_stale("w", Duration::from_secs(3600)).await.unwrap(), 0);
        assert_eq!(service.tiles().len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.purge_stale("w", Duration::from_millis(1)).await.unwrap(), 1);
        assert!(service.tiles().is_empty());
        let tile = service.tile("w", GroupCoords::new(0, 0)).await.unwrap();
        assert_eq!(&*tile, fog_png().unwrap());
    }
}
