use super::{
    addressed_to, manifest_of, transfer_set, HashManifest, ManifestScope, MapMessage,
    MessageStream, Side, Transport,
};
use crate::extractor::ChunkExtractor;
use crate::world::WorldSource;

use terramap_core::ChunkCoords;

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// World-side half of synchronization.
///
/// Answers storage manifests and chunk requests with [`MapMessage::ChunkData`], and on a [`MapMessage::SyncTrigger`] runs
/// the bootstrap diff against the most recent full manifest storage has reported.
pub struct SyncAgent<W> {
    world_id: String,
    extractor: ChunkExtractor<W>,
    transport: Arc<dyn Transport>,
    last_full_manifest: Mutex<Option<HashManifest>>,
}

impl<W: WorldSource> SyncAgent<W> {
    pub fn new(
        world_id: impl Into<String>,
        extractor: ChunkExtractor<W>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            world_id: world_id.into(),
            extractor,
            transport,
            last_full_manifest: Mutex::new(None),
        }
    }

    pub fn world_id(&self) -> &str {
        &self.world_id
    }

    /// Subscribes to everything storage sends this world.
    pub fn subscribe(&self) -> MessageStream {
        self.transport
            .subscribe(addressed_to(self.world_id.clone(), Side::World))
    }

    /// Handles messages until the stream closes.
    pub async fn run(&self, mut messages: MessageStream) {
        while let Some(message) = messages.recv().await {
            self.handle(message).await;
        }
        log::debug!("Sync agent for {} stopped", self.world_id);
    }

    /// Returns the number of chunks uploaded in response.
    pub async fn handle(&self, message: MapMessage) -> usize {
        if message.world_id() != self.world_id || message.destination() != Side::World {
            return 0;
        }
        match message {
            MapMessage::SyncTrigger { .. } => self.bootstrap().await,
            MapMessage::HashManifest { scope, hashes, .. } => {
                let remote = manifest_of(hashes);
                self.answer_manifest(scope, remote).await
            }
            MapMessage::ChunkRequest { coords, .. } => self.upload(&coords).await,
            _ => 0,
        }
    }

    /// Sends the world's map height and block color table, then every local chunk that the last full storage manifest lacks or holds stale.
    pub async fn bootstrap(&self) -> usize {
        if !self.extractor.is_available() {
            log::info!("Skipping bootstrap of {}: world not available", self.world_id);
            return 0;
        }
        self.publish_world_info().await;

        let local = self.extractor.extract_all_known_hashes().await;
        let remote = self.last_full_manifest.lock().clone().unwrap_or_default();
        let missing = transfer_set(&local, &remote);
        log::info!(
            "Bootstrap of {}: {} local chunks, {} to send",
            self.world_id,
            local.len(),
            missing.len()
        );
        self.upload(&missing).await
    }

    async fn answer_manifest(&self, scope: ManifestScope, remote: HashManifest) -> usize {
        let local = match scope {
            ManifestScope::Full => {
                *self.last_full_manifest.lock() = Some(remote.clone());
                self.publish_world_info().await;
                self.extractor.extract_all_known_hashes().await
            }
            ManifestScope::Region {
                center_x,
                center_z,
                radius,
            } => {
                self.extractor
                    .extract_region_hashes(ChunkCoords::new(center_x, center_z), radius)
                    .await
            }
        };
        let missing = transfer_set(&local, &remote);
        self.upload(&missing).await
    }

    /// Publishes the hashes of loaded chunks around `center` so storage can request what it lacks. Returns how many hashes
    /// were sent.
    pub async fn publish_region_hashes(&self, center: ChunkCoords, radius: u32) -> usize {
        let hashes = self.extractor.extract_region_hashes(center, radius).await;
        let n = hashes.len();
        if n > 0 {
            self.transport.publish(MapMessage::HashManifest {
                world_id: self.world_id.clone(),
                origin: Side::World,
                scope: ManifestScope::region(center, radius),
                hashes,
            });
        }
        n
    }

    /// Publishes what storage needs besides chunks to render this world: its map height and block color table.
    pub async fn publish_world_info(&self) {
        if let Some(map_height) = self.extractor.map_height().await {
            self.transport.publish(MapMessage::MapHeight {
                world_id: self.world_id.clone(),
                map_height,
            });
        }
        let colors = self.extractor.block_color_map().await;
        if colors.is_empty() {
            return;
        }
        self.transport
            .publish(MapMessage::block_colors(self.world_id.clone(), &colors));
    }

    async fn upload(&self, coords: &[ChunkCoords]) -> usize {
        if coords.is_empty() {
            return 0;
        }
        let started = Instant::now();
        let summaries = self.extractor.extract_chunks(coords).await;
        let sent = summaries.len();
        for summary in summaries {
            self.transport.publish(MapMessage::ChunkData {
                world_id: self.world_id.clone(),
                summary,
            });
        }
        log::debug!(
            "Sent {}/{} chunks of {} in {:?}",
            sent,
            coords.len(),
            self.world_id,
            started.elapsed()
        );
        sent
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
