//! Fixed-width little-endian encoding of chunk surface arrays.
//!
//! This is the same layout fed to [`ContentHash`](crate::ContentHash), and it is how the arrays are persisted.

pub fn heights_to_bytes(heights: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(heights.len() * 2);
    for h in heights {
        bytes.extend_from_slice(&h.to_le_bytes());
    }
    bytes
}

/// Returns `None` if `bytes` is not a whole number of `u16`s.
pub fn heights_from_bytes(bytes: &[u8]) -> Option<Vec<u16>> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect(),
    )
}

pub fn block_ids_to_bytes(block_ids: &[i32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(block_ids.len() * 4);
    for id in block_ids {
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    bytes
}

/// Returns `None` if `bytes` is not a whole number of `i32`s.
pub fn block_ids_from_bytes(bytes: &[u8]) -> Option<Vec<i32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
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

    #[test]
    fn heights_survive_boundary_values() {
        let heights = [0, 1, 255, 256, u16::MAX - 1, u16::MAX];
        let bytes = heights_to_bytes(&heights);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &[0, 0, 1, 0]);
        assert_eq!(heights_from_bytes(&bytes).unwrap(), heights);
    }

    #[test]
    fn block_ids_survive_boundary_values() {
        let ids = [0, -1, 1, i32::MIN, i32::MAX];
        let bytes = block_ids_to_bytes(&ids);
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[4..8], &[0xFF; 4]);
        assert_eq!(block_ids_from_bytes(&bytes).unwrap(), ids);
    }

    #[test]
    fn ragged_input_is_rejected() {
        assert_eq!(heights_from_bytes(&[1, 2, 3]), None);
        assert_eq!(block_ids_from_bytes(&[1, 2, 3, 4, 5]), None);
        assert_eq!(heights_from_bytes(&[]), Some(vec![]));
    }
}
