use std::fmt;

/// 32-byte block identifier: the blake3 digest of the block header.
///
/// Totally ordered so it can key the DAG's lookup maps and appear in
/// deterministic sets directly. Opaque to the finality logic; only the
/// store that mints blocks ever computes one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest header bytes into an identifier
    pub fn compute(header: &[u8]) -> Self {
        Self(*blake3::hash(header).as_bytes())
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: first four bytes are enough to tell blocks apart in logs
        write!(f, "{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(0x{})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_is_deterministic() {
        let hash = BlockHash::compute(b"block header");
        assert_eq!(hash, BlockHash::compute(b"block header"));
        assert_ne!(hash, BlockHash::compute(b"other header"));
    }

    #[test]
    fn test_ordering_follows_bytes() {
        let lo = BlockHash::from_bytes([0u8; 32]);
        let hi = BlockHash::from_bytes([255u8; 32]);
        assert!(lo < hi);
    }

    #[test]
    fn test_display_is_truncated() {
        let hash = BlockHash::compute(b"block header");
        assert_eq!(format!("{}", hash).len(), 8);
        assert!(format!("{:?}", hash).contains(&hex::encode(hash.as_bytes())));
    }
}
