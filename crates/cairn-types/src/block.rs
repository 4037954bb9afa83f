use crate::hash::BlockHash;
use crate::validator::{ValidatorId, Weight, WeightMap};

/// Immutable metadata of a block in the justification DAG.
///
/// This is the detector-facing view of a block: no payload, no signatures,
/// just the structure needed to reason about votes and observability.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockMetadata {
    /// Hash of the block
    pub hash: BlockHash,
    /// Validator that produced the block
    pub creator: ValidatorId,
    /// DAG level: longest justification-chain distance from genesis.
    /// Monotone along justification edges.
    pub rank: u64,
    /// Parent in the main tree; `None` for genesis. The voted-branch
    /// relation is defined on the main-parent tree, not on justifications.
    pub main_parent: Option<BlockHash>,
    /// Bonded stake per validator at this block's post-state
    pub weight_map: WeightMap,
    /// Hashes of the latest messages this block cites
    pub justifications: Vec<BlockHash>,
}

impl BlockMetadata {
    /// Total bonded weight at this block's post-state
    pub fn total_weight(&self) -> Weight {
        self.weight_map.values().sum()
    }
}

/// A validator's commitment to a consensus value: the block hash it votes
/// for as the next block to finalize, and the DAG level of the message
/// carrying that vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vote {
    /// The candidate block being voted for
    pub consensus_value: BlockHash,
    /// DAG level of the earliest message carrying this vote
    pub dag_level: u64,
}

impl Vote {
    pub fn new(consensus_value: BlockHash, dag_level: u64) -> Self {
        Self {
            consensus_value,
            dag_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_weight() {
        let mut block = BlockMetadata::default();
        block
            .weight_map
            .insert(ValidatorId::from_bytes([1u8; 32]), 10);
        block
            .weight_map
            .insert(ValidatorId::from_bytes([2u8; 32]), 25);
        assert_eq!(block.total_weight(), 35);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_vote_serde_roundtrip() {
        let vote = Vote::new(BlockHash::compute(b"candidate"), 12);
        let json = serde_json::to_string(&vote).unwrap();
        let back: Vote = serde_json::from_str(&json).unwrap();
        assert_eq!(vote, back);
    }
}
