use terramap_map::ExtractorConfig;
use terramap_render::RenderConfig;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory of the sled database holding every world's chunk rows.
    pub db_path: PathBuf,
    pub extractor: ExtractorConfig,
    pub render: RenderConfig,
    /// Rows not read for rendering within this many seconds are removed by [`MapService::purge_stale`](crate::MapService::purge_stale).
    pub retention_secs: u64,
    /// Radius in chunks of the regional hash manifests published during steady-state sync.
    pub region_radius: u32,
}

impl Config {
    pub fn read_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let reader = std::fs::File::open(path)
            .with_context(|| format!("Failed to open config {}", path.display()))?;

        ron::de::from_reader(reader).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("terramap.db"),
            extractor: Default::default(),
            render: Default::default(),
            retention_secs: 30 * 24 * 60 * 60,
            region_radius: 4,
        }
    }
}
