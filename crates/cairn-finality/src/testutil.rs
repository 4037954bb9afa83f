//! Shared fixtures for the test suites: deterministic validator ids and a
//! builder for small justification DAGs over [`InMemoryDag`].

use std::sync::Arc;

use cairn_types::{BlockHash, BlockMetadata, ValidatorId, Weight, WeightMap};

use crate::dag::{DagView, InMemoryDag};

/// Deterministic validator id from a single byte tag.
pub(crate) fn vid(tag: u8) -> ValidatorId {
    ValidatorId::from_bytes([tag; 32])
}

/// Builds chains of blocks on top of a genesis with a fixed weight map.
/// Ranks and hashes are derived automatically; the weight map is carried
/// into every block's post-state.
pub(crate) struct DagBuilder {
    dag: Arc<InMemoryDag>,
    genesis: BlockHash,
    weights: WeightMap,
    counter: u64,
}

impl DagBuilder {
    pub fn genesis(weights: &[(ValidatorId, Weight)]) -> Self {
        let weights: WeightMap = weights.iter().copied().collect();
        let genesis = BlockMetadata {
            hash: BlockHash::compute(b"genesis"),
            weight_map: weights.clone(),
            ..Default::default()
        };
        let dag = Arc::new(InMemoryDag::new());
        dag.insert(genesis.clone()).unwrap();
        Self {
            dag,
            genesis: genesis.hash,
            weights,
            counter: 0,
        }
    }

    /// Genesis hash, the initial last finalized block.
    pub fn lfb(&self) -> BlockHash {
        self.genesis
    }

    pub fn dag(&self) -> Arc<InMemoryDag> {
        Arc::clone(&self.dag)
    }

    /// Add a block; rank is one past the highest rank among the main parent
    /// and the justifications.
    pub fn block(
        &mut self,
        creator: ValidatorId,
        main_parent: BlockHash,
        justifications: &[BlockHash],
    ) -> BlockHash {
        self.counter += 1;
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(b"block-");
        payload.extend_from_slice(&self.counter.to_le_bytes());
        let hash = BlockHash::compute(&payload);

        let parent_rank = self.dag.lookup(&main_parent).unwrap().rank;
        let rank = justifications
            .iter()
            .map(|j| self.dag.lookup(j).unwrap().rank)
            .chain(std::iter::once(parent_rank))
            .max()
            .unwrap()
            + 1;

        self.dag
            .insert(BlockMetadata {
                hash,
                creator,
                rank,
                main_parent: Some(main_parent),
                weight_map: self.weights.clone(),
                justifications: justifications.to_vec(),
            })
            .unwrap();
        hash
    }
}
