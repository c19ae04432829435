//! Placeholder imagery for groups with no known chunk data.

use crate::encode_png;

use terramap_core::GROUP_PIXELS;

use image::{ImageError, Rgba, RgbaImage};
use once_cell::sync::OnceCell;

const FOG_BASE: f32 = 46.0;
const FOG_CENTER_GAIN: f32 = 0.18;
const FOG_EDGE_LOSS: f32 = 0.42;
const FOG_NOISE_AMPLITUDE: f32 = 4.0;
const FOG_BLUE_TINT: f32 = 9.0;
const FOG_ALPHA_CENTER: f32 = 208.0;
const FOG_ALPHA_EDGE: f32 = 236.0;

/// The fog color at pixel `(x, y)` of a `size` x `size` tile. Dim at the edges, slightly brighter in the middle, with a
/// faint sinusoidal texture. More opaque toward the edges.
pub fn fog_pixel(x: u32, y: u32, size: u32) -> Rgba<u8> {
    let half = (size.max(2) - 1) as f32 / 2.0;
    let dx = (x as f32 - half) / half;
    let dy = (y as f32 - half) / half;
    // 0 at the center, 1 in the corners.
    let d = ((dx * dx + dy * dy) / 2.0).sqrt().min(1.0);

    let vignette = 1.0 + FOG_CENTER_GAIN * (1.0 - d) - FOG_EDGE_LOSS * d * d;
    let (fx, fy) = (x as f32, y as f32);
    let noise = (fx * 0.21).sin() * (fy * 0.17).cos() + 0.5 * ((fx + fy) * 0.053).sin();

    let value = FOG_BASE * vignette + FOG_NOISE_AMPLITUDE * noise;
    let alpha = FOG_ALPHA_CENTER + (FOG_ALPHA_EDGE - FOG_ALPHA_CENTER) * d;

    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(value),
        channel(value),
        channel(value + FOG_BLUE_TINT),
        channel(alpha),
    ])
}

pub fn fog_tile(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| fog_pixel(x, y, size))
}

/// The encoded fog tile at group resolution, built once per process.
pub fn fog_png() -> Result<&'static [u8], ImageError> {
    static FOG_PNG: OnceCell<Vec<u8>> = OnceCell::new();
    FOG_PNG
        .get_or_try_init(|| encode_png(&fog_tile(GROUP_PIXELS)))
        .map(Vec::as_slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fog_is_deterministic() {
        let a = encode_png(&fog_tile(GROUP_PIXELS)).unwrap();
        let b = encode_png(&fog_tile(GROUP_PIXELS)).unwrap();
        assert_eq!(a, b);
        assert_eq!(fog_png().unwrap(), a.as_slice());
        assert!(std::ptr::eq(fog_png().unwrap(), fog_png().unwrap()));
    }

    #[test]
    fn edges_are_dimmer_and_more_opaque() {
        let size = GROUP_PIXELS;
        let center = fog_pixel(size / 2, size / 2, size);
        let corner = fog_pixel(0, 0, size);
        assert!(corner[0] < center[0]);
        assert!(corner[3] > center[3]);
    }

    #[test]
    fn tiny_tiles_do_not_divide_by_zero() {
        let tile = fog_tile(1);
        assert_eq!(tile.dimensions(), (1, 1));
    }
}
