use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Build height assumed for worlds that have not reported their own. A cell at half the height renders at its base
    /// color.
    pub map_height: u16,
    pub hill_shading: bool,
    /// Width of the box blur window used to estimate local terrain, in pixels.
    pub blur_range: u32,
    /// How strongly a cell's height relative to its neighborhood darkens or lightens it.
    pub relief_strength: f32,
    /// Maximum number of encoded tiles kept in memory.
    pub tile_cache_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            map_height: 256,
            hill_shading: true,
            blur_range: 5,
            relief_strength: 0.35,
            tile_cache_capacity: 512,
        }
    }
}

impl RenderConfig {
    /// This config with the world's reported build height, if it reported a usable one.
    pub fn for_world(mut self, map_height: Option<u16>) -> Self {
        if let Some(h) = map_height.filter(|&h| h > 0) {
            self.map_height = h;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_height_wins() {
        let config = RenderConfig::default();
        assert_eq!(config.for_world(Some(512)).map_height, 512);
        assert_eq!(config.for_world(None).map_height, 256);
        assert_eq!(config.for_world(Some(0)).map_height, 256);
    }
}
