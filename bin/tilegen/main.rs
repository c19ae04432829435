use terramap::terramap_core::{
    work_timer::WorkTimer, ChunkCoords, GroupCoords, Material, CHUNKS_PER_GROUP, CHUNK_SIZE,
};
use terramap::terramap_map::{
    BlockDescriptor, ChunkExtractor, ChunkStore, GridWorld, LocalBus, MessageStream, SyncAgent, Transport, WorldSize,
    WorldThread,
};
use terramap::{Config, MapService, SyncService};

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const GRASS: i32 = 1;
const SAND: i32 = 2;
const WATER: i32 = 3;
const ROCK: i32 = 4;
const SNOW: i32 = 5;
const FOREST: i32 = 6;
const SEA_LEVEL: u16 = 62;

#[derive(Parser, Debug)]
#[command(version, about = "Syncs a generated world into a chunk store and writes its map tiles as PNG files")]
struct Args {
    /// RON config file. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory the tiles are written to.
    #[arg(long, default_value = "tiles")]
    out: PathBuf,

    #[arg(long, default_value = "demo")]
    world: String,

    /// World edge length in blocks.
    #[arg(long, default_value_t = 512)]
    size: u32,

    /// Keep the chunk store in memory instead of at the configured path.
    #[arg(long)]
    temporary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::read_file(path)?,
        None => {
            log::info!("No config given, using defaults");
            Config::default()
        }
    };

    let bus: Arc<dyn Transport> = Arc::new(LocalBus::new());

    // World side.
    let world = generate_world(args.size, config.render.map_height);
    let world_thread = WorldThread::spawn(world, config.extractor).context("Failed to spawn world thread")?;
    let agent = SyncAgent::new(args.world.clone(), ChunkExtractor::new(Arc::new(world_thread)), bus.clone());
    let mut world_inbox = agent.subscribe();

    // Storage side.
    let store = if args.temporary {
        ChunkStore::temporary()?
    } else {
        ChunkStore::open(&config.db_path)
            .with_context(|| format!("Failed to open chunk store at {}", config.db_path.display()))?
    };
    let map = Arc::new(MapService::new(store, config.render)?);
    let service = SyncService::new(map.clone(), bus.clone());
    let mut storage_inbox = service.subscribe();

    // Full sync: storage reports what it has, the world side answers with its map height, block colors and the difference.
    service.send_manifest(&args.world).await?;
    deliver_to_world(&agent, &mut world_inbox).await;
    let stored = deliver_to_storage(&service, &mut storage_inbox).await?;
    log::info!("Full sync stored {} changed chunks", stored);

    // One steady-state pass around the world's center, as the world side would run periodically.
    let center = ChunkCoords::containing_block(args.size as i32 / 2, args.size as i32 / 2);
    agent.publish_region_hashes(center, config.region_radius).await;
    deliver_to_storage(&service, &mut storage_inbox).await?;
    deliver_to_world(&agent, &mut world_inbox).await;
    deliver_to_storage(&service, &mut storage_inbox).await?;

    // And the same square from storage's end.
    service
        .send_region_manifest(&args.world, center, config.region_radius)
        .await?;
    deliver_to_world(&agent, &mut world_inbox).await;
    let refreshed = deliver_to_storage(&service, &mut storage_inbox).await?;
    log::info!("Regional pass refreshed {} chunks", refreshed);

    std::fs::create_dir_all(&args.out).with_context(|| format!("Failed to create {}", args.out.display()))?;
    let groups = args.size.div_ceil(CHUNK_SIZE * CHUNKS_PER_GROUP as u32) as i32;
    let mut timer = WorkTimer::start();
    for gx in 0..groups {
        for gz in 0..groups {
            let t = Instant::now();
            let png = map.tile(&args.world, GroupCoords::new(gx, gz)).await?;
            timer.complete_item(t.elapsed());

            let path = args.out.join(format!("{}_{}_{}.png", args.world, gx, gz));
            std::fs::write(&path, &*png).with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }
    log::info!(
        "Wrote {} tiles to {} in {:?} ({} us per tile)",
        timer.items_completed(),
        args.out.display(),
        timer.elapsed(),
        timer.average_item_time_us()
    );

    let purged = map.purge_stale(&args.world, config.retention()).await?;
    log::info!("Retention pass removed {} chunks", purged);
    map.store().flush().await?;

    Ok(())
}

async fn deliver_to_world(agent: &SyncAgent<GridWorld>, inbox: &mut MessageStream) {
    while let Ok(message) = inbox.try_recv() {
        agent.handle(message).await;
    }
}

/// Returns how many chunks changed in storage.
async fn deliver_to_storage(service: &SyncService, inbox: &mut MessageStream) -> anyhow::Result<usize> {
    let mut changed = 0;
    while let Ok(message) = inbox.try_recv() {
        if let terramap::SyncOutcome::Stored { changed: true, .. } = service.handle(message).await? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Rolling hills around a lake, with snow caps and a forest band.
fn generate_world(size: u32, map_height: u16) -> GridWorld {
    let top = map_height.saturating_sub(1) as f32;
    let mut world = GridWorld::generate(WorldSize::new(size, size), map_height, |x, z| {
        let (fx, fz) = (x as f32, z as f32);
        let hills = (fx * 0.021).sin() * (fz * 0.017).cos() * 40.0 + (fx * 0.0043 + fz * 0.0061).sin() * 30.0;
        let height = (SEA_LEVEL as f32 + 10.0 + hills).clamp(1.0, top) as u16;
        let block = match height {
            h if h < SEA_LEVEL => WATER,
            h if h < SEA_LEVEL + 3 => SAND,
            h if h > 120 => SNOW,
            h if h > 100 => ROCK,
            h if h > 85 => FOREST,
            _ => GRASS,
        };
        (height.max(SEA_LEVEL), block)
    });
    world.register_block(BlockDescriptor::new(GRASS, "blocks/terrain/grass", Material::Grass));
    world.register_block(BlockDescriptor::new(SAND, "blocks/terrain/sand", Material::Sand));
    world.register_block(BlockDescriptor::new(WATER, "blocks/fluid/water", Material::Water));
    world.register_block(BlockDescriptor::new(ROCK, "blocks/terrain/granite", Material::Rock));
    world.register_block(BlockDescriptor::new(SNOW, "blocks/terrain/surface_snow", Material::Snow));
    world.register_block(BlockDescriptor::new(FOREST, "blocks/tree/pine_leaves", Material::Leaves));
    world
}
