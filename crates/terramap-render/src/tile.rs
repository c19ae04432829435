use crate::blur::box_blur;
use crate::brightness::{apply_brightness, height_factor, relief_factor};
use crate::config::RenderConfig;
use crate::encode_png;
use crate::fog::fog_tile;

use terramap_core::{
    argb_to_rgba, assert_surface_len, color_code_of, local_coords, BlockColorMap, ColorTable,
    GroupCoords, StoredChunk, GROUP_AREA, GROUP_PIXELS,
};

use image::{ImageError, Rgba, RgbaImage};

/// Composes the tile for `group` from whichever of its chunks are known, over a fog background. Returns `None` when
/// `chunks` is empty so the caller can substitute the shared fog tile.
///
/// # Panics
///
/// If a chunk lies outside `group` or has malformed surface arrays.
pub fn compose_tile(
    group: GroupCoords,
    chunks: &[StoredChunk],
    colors: &BlockColorMap,
    config: &RenderConfig,
) -> Option<RgbaImage> {
    if chunks.is_empty() {
        return None;
    }

    let table = ColorTable::default();
    let width = GROUP_PIXELS as usize;
    // Base color per covered pixel, and the height plane used for relief (0 = no data).
    let mut base = vec![None; GROUP_AREA];
    let mut heights = vec![0.0f32; GROUP_AREA];

    for chunk in chunks {
        assert!(
            group.contains(chunk.coords),
            "chunk {:?} is outside group {:?}",
            chunk.coords,
            group
        );
        assert_surface_len(&chunk.heights, &chunk.block_ids);

        let [ox, oz] = group.pixel_offset(chunk.coords);
        for (i, (&h, &block_id)) in chunk.heights.iter().zip(chunk.block_ids.iter()).enumerate() {
            let [lx, lz] = local_coords(i);
            let p = (oz + lz) as usize * width + (ox + lx) as usize;
            let argb = table[color_code_of(colors, block_id)];
            base[p] = Some(apply_brightness(argb, height_factor(h, config.map_height)));
            heights[p] = h as f32;
        }
    }

    let relief = config.hill_shading.then(|| {
        let mut blurred = heights.clone();
        box_blur(&mut blurred, width, width, config.blur_range as usize);
        blurred
    });

    let mut tile = fog_tile(GROUP_PIXELS);
    for (p, argb) in base.into_iter().enumerate() {
        let Some(mut argb) = argb else {
            continue;
        };
        if let Some(blurred) = &relief {
            let factor = relief_factor(heights[p], blurred[p], config.relief_strength, config.map_height);
            if factor != 1.0 {
                argb = apply_brightness(argb, factor);
            }
        }
        let (x, y) = ((p % width) as u32, (p / width) as u32);
        tile.put_pixel(x, y, Rgba(argb_to_rgba(argb)));
    }
    Some(tile)
}

/// [`compose_tile`], encoded as PNG.
pub fn render_grouped_tile(
    group: GroupCoords,
    chunks: &[StoredChunk],
    colors: &BlockColorMap,
    config: &RenderConfig,
) -> Result<Option<Vec<u8>>, ImageError> {
    compose_tile(group, chunks, colors, config)
        .map(|tile| encode_png(&tile))
        .transpose()
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
