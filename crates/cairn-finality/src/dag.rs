//! Read-only view over the block DAG, and an in-memory reference store.
//!
//! The finality detector never owns block storage. It consumes the
//! [`DagView`] contract, which a node's storage layer implements; the
//! bundled [`InMemoryDag`] is the reference implementation used by the
//! finalizer loop in tests and by single-process deployments.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use cairn_types::{BlockHash, BlockMetadata, ValidatorId};

use crate::error::FinalityError;

/// Read-only contract the detector requires from the block store.
///
/// Implementations must be internally consistent: acyclic, total on known
/// hashes, with `rank` monotone along justification edges. All methods are
/// read-only with respect to consensus state.
pub trait DagView {
    /// Metadata of a block. A hash presumed present but missing is an error,
    /// propagated unchanged; the store is authoritative.
    fn lookup(&self, hash: &BlockHash) -> Result<BlockMetadata, FinalityError>;

    /// Latest (highest-rank) message of every validator seen so far.
    fn latest_messages(&self) -> Result<BTreeMap<ValidatorId, BlockMetadata>, FinalityError>;

    /// The main-tree child of `from_lfb` on the path from `from_lfb` to
    /// `block`, or `None` when `block` does not descend from `from_lfb`.
    fn voted_branch(
        &self,
        from_lfb: &BlockHash,
        block: &BlockHash,
    ) -> Result<Option<BlockHash>, FinalityError>;

    /// The validator's most recent contiguous run of own messages voting for
    /// `vote_value`, ordered oldest first. Empty when its latest message
    /// votes elsewhere.
    fn level_zero_messages(
        &self,
        validator: &ValidatorId,
        vote_value: &BlockHash,
    ) -> Result<Vec<BlockMetadata>, FinalityError>;
}

#[derive(Default)]
struct DagInner {
    blocks: HashMap<BlockHash, BlockMetadata>,
    /// Per-validator message hashes in insertion order (ascending rank)
    by_validator: HashMap<ValidatorId, Vec<BlockHash>>,
    latest: BTreeMap<ValidatorId, BlockHash>,
}

impl DagInner {
    /// Whether `message` votes for `value`: `value` is the message itself or
    /// lies on its main-parent chain.
    fn votes_for(&self, message: &BlockMetadata, value: &BlockMetadata) -> bool {
        let mut cur = message;
        loop {
            if cur.hash == value.hash {
                return true;
            }
            if cur.rank <= value.rank {
                return false;
            }
            let Some(parent) = cur.main_parent else {
                return false;
            };
            match self.blocks.get(&parent) {
                Some(parent) => cur = parent,
                None => return false,
            }
        }
    }
}

/// In-memory block DAG.
///
/// Keeps every inserted block, the per-validator message history, and the
/// latest message per validator. Insertion rejects blocks whose main parent
/// or justifications are unknown, which keeps the store total on known
/// hashes.
#[derive(Default)]
pub struct InMemoryDag {
    inner: RwLock<DagInner>,
}

impl InMemoryDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block to the store
    pub fn insert(&self, block: BlockMetadata) -> Result<(), FinalityError> {
        let mut inner = self.inner.write();

        if inner.blocks.contains_key(&block.hash) {
            return Err(FinalityError::DuplicateBlock(block.hash));
        }
        if let Some(parent) = block.main_parent {
            if !inner.blocks.contains_key(&parent) {
                return Err(FinalityError::MissingParent {
                    block: block.hash,
                    parent,
                });
            }
        }
        for justification in &block.justifications {
            if !inner.blocks.contains_key(justification) {
                return Err(FinalityError::MissingJustification {
                    block: block.hash,
                    justification: *justification,
                });
            }
        }

        let is_latest = match inner.latest.get(&block.creator) {
            Some(prev) => inner.blocks[prev].rank < block.rank,
            None => true,
        };
        if is_latest {
            inner.latest.insert(block.creator, block.hash);
        }
        inner
            .by_validator
            .entry(block.creator)
            .or_default()
            .push(block.hash);

        tracing::debug!(block = %block.hash, rank = block.rank, "block added to dag");
        inner.blocks.insert(block.hash, block);
        Ok(())
    }

    /// Check whether a block is known
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.inner.read().blocks.contains_key(hash)
    }

    /// Number of blocks in the store
    pub fn len(&self) -> usize {
        self.inner.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().blocks.is_empty()
    }
}

impl DagView for InMemoryDag {
    fn lookup(&self, hash: &BlockHash) -> Result<BlockMetadata, FinalityError> {
        self.inner
            .read()
            .blocks
            .get(hash)
            .cloned()
            .ok_or(FinalityError::BlockNotFound(*hash))
    }

    fn latest_messages(&self) -> Result<BTreeMap<ValidatorId, BlockMetadata>, FinalityError> {
        let inner = self.inner.read();
        Ok(inner
            .latest
            .iter()
            .map(|(validator, hash)| (*validator, inner.blocks[hash].clone()))
            .collect())
    }

    fn voted_branch(
        &self,
        from_lfb: &BlockHash,
        block: &BlockHash,
    ) -> Result<Option<BlockHash>, FinalityError> {
        let inner = self.inner.read();
        let lfb = inner
            .blocks
            .get(from_lfb)
            .ok_or(FinalityError::BlockNotFound(*from_lfb))?;
        let mut cur = inner
            .blocks
            .get(block)
            .ok_or(FinalityError::BlockNotFound(*block))?;

        while cur.rank > lfb.rank {
            let Some(parent) = cur.main_parent else {
                break;
            };
            if parent == *from_lfb {
                return Ok(Some(cur.hash));
            }
            cur = inner
                .blocks
                .get(&parent)
                .ok_or(FinalityError::BlockNotFound(parent))?;
        }
        Ok(None)
    }

    fn level_zero_messages(
        &self,
        validator: &ValidatorId,
        vote_value: &BlockHash,
    ) -> Result<Vec<BlockMetadata>, FinalityError> {
        let inner = self.inner.read();
        let value = inner
            .blocks
            .get(vote_value)
            .ok_or(FinalityError::BlockNotFound(*vote_value))?;

        let Some(hashes) = inner.by_validator.get(validator) else {
            return Ok(Vec::new());
        };

        // Walk the validator's own messages newest to oldest while they keep
        // voting for the value, then restore oldest-first order.
        let mut run = Vec::new();
        for hash in hashes.iter().rev() {
            let message = &inner.blocks[hash];
            if inner.votes_for(message, value) {
                run.push(message.clone());
            } else {
                break;
            }
        }
        run.reverse();
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{vid, DagBuilder};

    #[test]
    fn test_insert_rejects_unknown_parent() {
        let dag = InMemoryDag::new();
        let orphan = BlockMetadata {
            hash: BlockHash::compute(b"orphan"),
            rank: 1,
            main_parent: Some(BlockHash::compute(b"nowhere")),
            ..Default::default()
        };
        assert!(matches!(
            dag.insert(orphan),
            Err(FinalityError::MissingParent { .. })
        ));
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let genesis = BlockMetadata {
            hash: BlockHash::compute(b"genesis"),
            ..Default::default()
        };
        let dag = InMemoryDag::new();
        dag.insert(genesis.clone()).unwrap();
        assert_eq!(
            dag.insert(genesis.clone()),
            Err(FinalityError::DuplicateBlock(genesis.hash))
        );
    }

    #[test]
    fn test_lookup_missing_block() {
        let dag = InMemoryDag::new();
        let missing = BlockHash::compute(b"missing");
        assert_eq!(
            dag.lookup(&missing),
            Err(FinalityError::BlockNotFound(missing))
        );
    }

    #[test]
    fn test_latest_messages_track_highest_rank() {
        let (a, b) = (vid(1), vid(2));
        let mut builder = DagBuilder::genesis(&[(a, 10), (b, 10)]);
        let genesis = builder.lfb();
        let x = builder.block(a, genesis, &[genesis]);
        let y = builder.block(b, x, &[x]);
        let z = builder.block(a, x, &[y]);
        let dag = builder.dag();

        let latest = dag.latest_messages().unwrap();
        assert_eq!(latest[&a].hash, z);
        assert_eq!(latest[&b].hash, y);
    }

    #[test]
    fn test_voted_branch_walks_main_parents() {
        let (a, b) = (vid(1), vid(2));
        let mut builder = DagBuilder::genesis(&[(a, 10), (b, 10)]);
        let genesis = builder.lfb();
        let x = builder.block(a, genesis, &[genesis]);
        let deeper = builder.block(b, x, &[x]);
        let dag = builder.dag();

        // Both the child itself and its descendants vote for the child.
        assert_eq!(dag.voted_branch(&genesis, &x).unwrap(), Some(x));
        assert_eq!(dag.voted_branch(&genesis, &deeper).unwrap(), Some(x));
        // The LFB does not vote for any of its own children.
        assert_eq!(dag.voted_branch(&genesis, &genesis).unwrap(), None);
        // Relative to x, the deeper block is itself the voted child.
        assert_eq!(dag.voted_branch(&x, &deeper).unwrap(), Some(deeper));
    }

    #[test]
    fn test_voted_branch_none_for_sibling() {
        let (a, b) = (vid(1), vid(2));
        let mut builder = DagBuilder::genesis(&[(a, 10), (b, 10)]);
        let genesis = builder.lfb();
        let x = builder.block(a, genesis, &[genesis]);
        let y = builder.block(b, genesis, &[genesis]);
        let dag = builder.dag();

        // y is not a descendant of x.
        assert_eq!(dag.voted_branch(&x, &y).unwrap(), None);
    }

    #[test]
    fn test_level_zero_messages_stop_at_defection() {
        let (a, b) = (vid(1), vid(2));
        let mut builder = DagBuilder::genesis(&[(a, 10), (b, 10)]);
        let genesis = builder.lfb();
        let x = builder.block(a, genesis, &[genesis]);
        let y = builder.block(b, genesis, &[genesis]);

        // a votes x, defects to y, then returns to the x branch twice.
        let a1 = builder.block(a, x, &[x]);
        let a2 = builder.block(a, y, &[y, a1]);
        let a3 = builder.block(a, x, &[x, a2]);
        let a4 = builder.block(a, a3, &[a3]);
        let dag = builder.dag();

        let run = dag.level_zero_messages(&a, &x).unwrap();
        let hashes: Vec<BlockHash> = run.iter().map(|m| m.hash).collect();
        // Only the contiguous run since the return counts; a1 is cut off by
        // the defection in between.
        assert_eq!(hashes, vec![a3, a4]);
    }

    #[test]
    fn test_level_zero_messages_empty_when_voting_elsewhere() {
        let (a, b) = (vid(1), vid(2));
        let mut builder = DagBuilder::genesis(&[(a, 10), (b, 10)]);
        let genesis = builder.lfb();
        let x = builder.block(a, genesis, &[genesis]);
        let y = builder.block(b, genesis, &[genesis]);
        let dag = builder.dag();

        assert!(dag.level_zero_messages(&a, &y).unwrap().is_empty());
        assert!(dag.level_zero_messages(&b, &x).unwrap().is_empty());
    }
}
