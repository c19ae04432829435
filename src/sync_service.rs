use crate::map_service::MapService;

use terramap_core::{BlockColorMap, ChunkCoords};
use terramap_map::{
    manifest_of, transfer_set, ManifestScope, MapDbError, MapMessage, MessageStream, Side,
    Transport,
};

use std::sync::Arc;

/// What the storage side did with one message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SyncOutcome {
    Stored { coords: ChunkCoords, changed: bool },
    Requested(Vec<ChunkCoords>),
    ColorsUpdated { changed: bool },
    MapHeightUpdated { changed: bool },
    Ignored,
}

/// Storage-side half of synchronization. Persists incoming chunks and asks the world side for whatever its manifests
/// show storage is missing.
pub struct SyncService {
    map: Arc<MapService>,
    transport: Arc<dyn Transport>,
}

impl SyncService {
    pub fn new(map: Arc<MapService>, transport: Arc<dyn Transport>) -> Self {
        Self { map, transport }
    }

    pub fn map(&self) -> &Arc<MapService> {
        &self.map
    }

    /// Subscribes to everything addressed to storage, for every world.
    pub fn subscribe(&self) -> MessageStream {
        self.transport
            .subscribe(Box::new(|m: &MapMessage| m.destination() == Side::Storage))
    }

    /// Handles messages until the stream closes. Storage failures are logged; the world side's next sync pass retries.
    pub async fn run(&self, mut messages: MessageStream) {
        while let Some(message) = messages.recv().await {
            let world_id = message.world_id().to_owned();
            if let Err(e) = self.handle(message).await {
                log::error!("Sync of {} failed: {}", world_id, e);
            }
        }
    }

    pub async fn handle(&self, message: MapMessage) -> Result<SyncOutcome, MapDbError> {
        match message {
            MapMessage::ChunkData { world_id, summary } => {
                let coords = summary.coords;
                let changed = self.map.store_chunk(&world_id, summary).await?;
                Ok(SyncOutcome::Stored { coords, changed })
            }
            MapMessage::HashManifest {
                world_id,
                origin: Side::World,
                hashes,
                ..
            } => {
                let coords = hashes.iter().map(|r| r.coords).collect();
                let stored = manifest_of(self.map.store().chunk_hashes(&world_id, coords).await?);
                let missing = transfer_set(&hashes, &stored);
                if !missing.is_empty() {
                    log::debug!("Requesting {} chunks of {}", missing.len(), world_id);
                    self.transport.publish(MapMessage::ChunkRequest {
                        world_id,
                        coords: missing.clone(),
                    });
                }
                Ok(SyncOutcome::Requested(missing))
            }
            MapMessage::BlockColors { world_id, colors } => {
                let colors: BlockColorMap = colors.into_iter().collect();
                let changed = self.map.write_block_colors(&world_id, colors).await?;
                Ok(SyncOutcome::ColorsUpdated { changed })
            }
            MapMessage::MapHeight {
                world_id,
                map_height,
            } => {
                let changed = self.map.write_map_height(&world_id, map_height).await?;
                Ok(SyncOutcome::MapHeightUpdated { changed })
            }
            _ => Ok(SyncOutcome::Ignored),
        }
    }

    /// Publishes storage's full manifest for `world_id`. The world side answers with every chunk storage lacks or holds
    /// stale. Returns the number of hashes sent.
    pub async fn send_manifest(&self, world_id: &str) -> Result<usize, MapDbError> {
        let hashes = self.map.store().all_hashes(world_id).await?;
        let n = hashes.len();
        self.transport.publish(MapMessage::HashManifest {
            world_id: world_id.to_owned(),
            origin: Side::Storage,
            scope: ManifestScope::Full,
            hashes,
        });
        log::info!("Sent manifest of {} with {} chunks", world_id, n);
        Ok(n)
    }

    /// Publishes storage's hashes for the square of chunks around `center`. The world side answers with the loaded chunks
    /// of that square that storage lacks or holds stale.
    pub async fn send_region_manifest(
        &self,
        world_id: &str,
        center: ChunkCoords,
        radius: u32,
    ) -> Result<usize, MapDbError> {
        let hashes = self.map.store().region_hashes(world_id, center, radius).await?;
        let n = hashes.len();
        self.transport.publish(MapMessage::HashManifest {
            world_id: world_id.to_owned(),
            origin: Side::Storage,
            scope: ManifestScope::region(center, radius),
            hashes,
        });
        log::debug!("Sent region manifest of {} around {:?} with {} chunks", world_id, center, n);
        Ok(n)
    }

    /// Asks the world side to rerun its bootstrap diff.
    pub fn request_bootstrap(&self, world_id: &str) {
        self.transport.publish(MapMessage::SyncTrigger {
            world_id: world_id.to_owned(),
        });
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
