//! Rendering of grouped map tiles.
//!
//! A tile covers [`CHUNKS_PER_GROUP`](terramap_core::CHUNKS_PER_GROUP) x `CHUNKS_PER_GROUP` chunks at one pixel per cell.
//! Each cell takes its block's palette color, scaled by a height-derived brightness factor and optionally by a relief
//! factor from a box-blurred height plane. Cells without data show the fog-of-war pattern.

mod blur;
mod brightness;
mod cache;
mod config;
mod fog;
mod tile;

pub use blur::*;
pub use brightness::*;
pub use cache::*;
pub use config::*;
pub use fog::*;
pub use tile::*;

// Re-exports.
pub use image;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, RgbaImage};

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}
