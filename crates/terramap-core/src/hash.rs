use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Uppercase hex SHA-256 digest of a chunk surface.
///
/// The digest input is every height as a little-endian `u16`, followed by every block id as a little-endian `i32`. Both the
/// world side and the storage side must produce byte-identical input for identical arrays, so this layout is part of the
/// wire contract.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

pub const CONTENT_HASH_HEX_LEN: usize = 64;

impl ContentHash {
    pub fn of_surface(heights: &[u16], block_ids: &[i32]) -> Self {
        let mut hasher = Sha256::new();
        for h in heights {
            hasher.update(h.to_le_bytes());
        }
        for id in block_ids {
            hasher.update(id.to_le_bytes());
        }
        Self(hex::encode_upper(hasher.finalize()))
    }

    /// Parses a hex digest, normalizing to uppercase. Returns `None` for anything that is not 64 hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        (hex.len() == CONTENT_HASH_HEX_LEN && hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| Self(hex.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// A string that is not a 64 digit hex digest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidContentHash(pub String);

impl fmt::Display for InvalidContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid content hash {:?}", self.0)
    }
}

impl std::error::Error for InvalidContentHash {}

impl TryFrom<String> for ContentHash {
    type Error = InvalidContentHash;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        Self::from_hex(&hex).ok_or(InvalidContentHash(hex))
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CHUNK_AREA;

    #[test]
    fn equal_surfaces_hash_equal() {
        let heights = vec![64u16; CHUNK_AREA];
        let ids = vec![7i32; CHUNK_AREA];
        let a = ContentHash::of_surface(&heights, &ids);
        let b = ContentHash::of_surface(&heights.clone(), &ids.clone());
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), CONTENT_HASH_HEX_LEN);
        assert!(a.as_str().bytes().all(|c| !c.is_ascii_lowercase()));
    }

    #[test]
    fn any_single_cell_changes_the_hash() {
        let heights = vec![64u16; CHUNK_AREA];
        let ids = vec![7i32; CHUNK_AREA];
        let base = ContentHash::of_surface(&heights, &ids);
        for i in [0, 1, 31, 32, 500, CHUNK_AREA - 1] {
            let mut h = heights.clone();
            h[i] = 65;
            assert_ne!(ContentHash::of_surface(&h, &ids), base, "height cell {}", i);

            let mut b = ids.clone();
            b[i] = 8;
            assert_ne!(ContentHash::of_surface(&heights, &b), base, "block cell {}", i);
        }
    }

    #[test]
    fn hash_is_order_sensitive() {
        let a = ContentHash::of_surface(&[1, 2], &[3, 4]);
        let b = ContentHash::of_surface(&[2, 1], &[3, 4]);
        let c = ContentHash::of_surface(&[1, 2], &[4, 3]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn matches_sha256_of_little_endian_layout() {
        // 0x0102 as LE u16, then -1 as LE i32.
        let expected = hex::encode_upper(Sha256::digest([0x02, 0x01, 0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(ContentHash::of_surface(&[0x0102], &[-1]).as_str(), expected);
    }

    #[test]
    fn parse_normalizes_case() {
        let hash = ContentHash::of_surface(&[1], &[1]);
        let lower = hash.as_str().to_ascii_lowercase();
        assert_eq!(ContentHash::from_hex(&lower), Some(hash));
        assert_eq!(ContentHash::from_hex("ABC"), None);
        assert_eq!(ContentHash::from_hex(&"G".repeat(64)), None);
    }

    #[test]
    fn deserialize_validates_and_normalizes() {
        let hash = ContentHash::of_surface(&[1], &[1]);
        let lower = format!("{:?}", hash.as_str().to_ascii_lowercase());
        assert_eq!(ron::from_str::<ContentHash>(&lower).unwrap(), hash);
        assert!(ron::from_str::<ContentHash>("\"ABC\"").is_err());

        let written = ron::to_string(&hash).unwrap();
        assert_eq!(written, format!("{:?}", hash.as_str()));
    }
}
