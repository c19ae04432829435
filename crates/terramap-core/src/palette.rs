//! Semantic map colors.
//!
//! A [`ColorCode`] names a kind of terrain ("land", "forest", "lava", ...). Every code has a fully opaque packed ARGB value
//! and a compact index for lookup tables. Block materials map to a default code, and a [`BlockColorMap`] resolves concrete
//! block ids; anything unresolved renders as [`ColorCode::Land`].

use crate::SmallKeyHashMap;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ColorCode {
    Land = 0,
    Grass,
    Forest,
    Jungle,
    Swamp,
    Sand,
    Desert,
    Dirt,
    Stone,
    Mountain,
    Snow,
    Glacier,
    Ice,
    Water,
    DeepWater,
    Lava,
    Road,
    Building,
}

impl ColorCode {
    pub const COUNT: usize = 18;

    pub const ALL: [ColorCode; Self::COUNT] = [
        ColorCode::Land,
        ColorCode::Grass,
        ColorCode::Forest,
        ColorCode::Jungle,
        ColorCode::Swamp,
        ColorCode::Sand,
        ColorCode::Desert,
        ColorCode::Dirt,
        ColorCode::Stone,
        ColorCode::Mountain,
        ColorCode::Snow,
        ColorCode::Glacier,
        ColorCode::Ice,
        ColorCode::Water,
        ColorCode::DeepWater,
        ColorCode::Lava,
        ColorCode::Road,
        ColorCode::Building,
    ];

    #[inline]
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ColorCode::Land => "land",
            ColorCode::Grass => "grass",
            ColorCode::Forest => "forest",
            ColorCode::Jungle => "jungle",
            ColorCode::Swamp => "swamp",
            ColorCode::Sand => "sand",
            ColorCode::Desert => "desert",
            ColorCode::Dirt => "dirt",
            ColorCode::Stone => "stone",
            ColorCode::Mountain => "mountain",
            ColorCode::Snow => "snow",
            ColorCode::Glacier => "glacier",
            ColorCode::Ice => "ice",
            ColorCode::Water => "water",
            ColorCode::DeepWater => "deep_water",
            ColorCode::Lava => "lava",
            ColorCode::Road => "road",
            ColorCode::Building => "building",
        }
    }

    /// Packed `0xAARRGGBB`. Alpha is always `0xFF`.
    pub fn argb(self) -> u32 {
        let rgb = match self {
            ColorCode::Land => 0x8F9F5F,
            ColorCode::Grass => 0x6FA84A,
            ColorCode::Forest => 0x2F6B2A,
            ColorCode::Jungle => 0x1F7A35,
            ColorCode::Swamp => 0x4C5E3A,
            ColorCode::Sand => 0xDCCB8E,
            ColorCode::Desert => 0xE3B567,
            ColorCode::Dirt => 0x8A6642,
            ColorCode::Stone => 0x8C8C8C,
            ColorCode::Mountain => 0x6E6659,
            ColorCode::Snow => 0xF4F7FA,
            ColorCode::Glacier => 0xCFE6F2,
            ColorCode::Ice => 0xA5D4EE,
            ColorCode::Water => 0x3A6FC4,
            ColorCode::DeepWater => 0x1F3F8A,
            ColorCode::Lava => 0xE2581B,
            ColorCode::Road => 0x9A8F7E,
            ColorCode::Building => 0xB0745A,
        };
        0xFF00_0000 | rgb
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownColorCode(pub String);

impl fmt::Display for UnknownColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown color code {:?}", self.0)
    }
}

impl std::error::Error for UnknownColorCode {}

impl FromStr for ColorCode {
    type Err = UnknownColorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownColorCode(s.to_owned()))
    }
}

/// Physical category of a block, used when a block has no explicit color override.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Soil,
    Grass,
    Leaves,
    Wood,
    Sand,
    Rock,
    Gravel,
    Snow,
    Ice,
    Water,
    Lava,
    Mud,
    Brick,
    Metal,
    Fabric,
    Unknown,
}

impl Material {
    /// The generic color for this material, if it has one.
    pub fn default_color_code(self) -> Option<ColorCode> {
        match self {
            Material::Soil => Some(ColorCode::Dirt),
            Material::Grass => Some(ColorCode::Grass),
            Material::Leaves | Material::Wood => Some(ColorCode::Forest),
            Material::Sand => Some(ColorCode::Sand),
            Material::Rock => Some(ColorCode::Stone),
            Material::Gravel => Some(ColorCode::Road),
            Material::Snow => Some(ColorCode::Snow),
            Material::Ice => Some(ColorCode::Ice),
            Material::Water => Some(ColorCode::Water),
            Material::Lava => Some(ColorCode::Lava),
            Material::Mud => Some(ColorCode::Swamp),
            Material::Brick | Material::Metal => Some(ColorCode::Building),
            Material::Fabric | Material::Unknown => None,
        }
    }
}

/// Block id to color code. Ids missing from the map render as [`ColorCode::Land`].
pub type BlockColorMap = SmallKeyHashMap<i32, ColorCode>;

#[inline]
pub fn color_code_of(colors: &BlockColorMap, block_id: i32) -> ColorCode {
    colors.get(&block_id).copied().unwrap_or(ColorCode::Land)
}

/// Dense ARGB table addressed by [`ColorCode`].
#[derive(Clone, Debug)]
pub struct ColorTable {
    argb: [u32; ColorCode::COUNT],
}

impl Default for ColorTable {
    fn default() -> Self {
        let mut argb = [0; ColorCode::COUNT];
        for code in ColorCode::ALL {
            argb[code.index() as usize] = code.argb();
        }
        Self { argb }
    }
}

impl Index<ColorCode> for ColorTable {
    type Output = u32;

    #[inline]
    fn index(&self, code: ColorCode) -> &Self::Output {
        &self.argb[code.index() as usize]
    }
}

#[inline]
pub fn argb_to_rgba(argb: u32) -> [u8; 4] {
    let [a, r, g, b] = argb.to_be_bytes();
    [r, g, b, a]
}

#[inline]
pub fn rgba_to_argb([r, g, b, a]: [u8; 4]) -> u32 {
    u32::from_be_bytes([a, r, g, b])
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
