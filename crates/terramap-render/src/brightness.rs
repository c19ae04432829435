pub const MIN_BRIGHTNESS: f32 = 0.5;
pub const MAX_BRIGHTNESS: f32 = 1.5;

/// Scales the R, G, and B channels of a packed ARGB color by `factor`, saturating each channel to `[0, 255]`. Alpha is
/// preserved.
#[inline]
pub fn apply_brightness(argb: u32, factor: f32) -> u32 {
    let scale = |shift: u32| {
        let channel = ((argb >> shift) & 0xFF) as f32;
        // Float to int casts saturate, so negative and NaN products land on 0.
        ((channel * factor).min(255.0) as u32) << shift
    };
    (argb & 0xFF00_0000) | scale(16) | scale(8) | scale(0)
}

/// `clamp(height / (map_height / 2), 0.5, 1.5)`.
#[inline]
pub fn height_factor(height: u16, map_height: u16) -> f32 {
    let half = (map_height as f32 / 2.0).max(1.0);
    (height as f32 / half).clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS)
}

/// Brightness adjustment for a cell `height - neighborhood` blocks above its blurred surroundings.
#[inline]
pub fn relief_factor(height: f32, neighborhood: f32, relief_strength: f32, map_height: u16) -> f32 {
    let scale = (map_height as f32 / 8.0).max(1.0);
    (1.0 + relief_strength * (height - neighborhood) / scale).clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS)
}
