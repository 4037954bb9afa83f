//! Per-round voting state: the validator index, the N×N level matrix and
//! the first-level-zero votes.
//!
//! One [`VotingMatrix`] instance lives per finalization round. It is built
//! from the last finalized block's post-state weight map, mutated through
//! whole-row replacements and single-slot vote writes, and replaced
//! wholesale when a new block finalizes.

use std::collections::BTreeMap;

use cairn_types::{BlockHash, ValidatorId, Vote, Weight, WeightMap};

/// Bijection between the bonded validators of a round and `0..N`.
///
/// Slots are assigned in `ValidatorId` order, so equal weight maps always
/// produce equal indexes. Validators with zero weight are left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorIndex {
    ids: Vec<ValidatorId>,
    slots: BTreeMap<ValidatorId, usize>,
}

impl ValidatorIndex {
    /// Build the index and the parallel weight array from a weight map.
    pub fn from_weight_map(weight_map: &WeightMap) -> (Self, Vec<Weight>) {
        let mut ids = Vec::new();
        let mut weights = Vec::new();
        for (id, weight) in weight_map {
            if *weight > 0 {
                ids.push(*id);
                weights.push(*weight);
            }
        }
        let slots = ids.iter().enumerate().map(|(slot, id)| (*id, slot)).collect();
        (Self { ids, slots }, weights)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Slot of a validator, `None` for validators not bonded this round
    pub fn slot_of(&self, id: &ValidatorId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    /// Validator at a slot. Panics if the slot is out of range.
    pub fn id_at(&self, slot: usize) -> ValidatorId {
        self.ids[slot]
    }

    pub fn ids(&self) -> &[ValidatorId] {
        &self.ids
    }
}

/// Quorum threshold: strictly more than half the total weight plus the
/// safety margin given by the relative fault tolerance threshold.
pub(crate) fn quorum_threshold(total_weight: Weight, rftt: f64) -> Weight {
    ((0.5 + rftt) * total_weight as f64).ceil() as Weight
}

/// Voting state of one finalization round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VotingMatrix {
    last_finalized: BlockHash,
    index: ValidatorIndex,
    weights: Vec<Weight>,
    total_weight: Weight,
    quorum: Weight,
    /// `levels[i][j]`: highest rank of any message by validator `j` observed
    /// in validator `i`'s latest message's justification cone
    levels: Vec<Vec<u64>>,
    first_level_zero_votes: Vec<Option<Vote>>,
}

impl VotingMatrix {
    /// Zero-initialized state for a round rooted at `last_finalized`, whose
    /// post-state weight map is `weight_map`. The quorum threshold is
    /// derived here, once, and reused for every committee check of the
    /// round.
    pub fn new(last_finalized: BlockHash, weight_map: &WeightMap, rftt: f64) -> Self {
        let (index, weights) = ValidatorIndex::from_weight_map(weight_map);
        let n = index.len();
        let total_weight = weights.iter().sum();
        Self {
            last_finalized,
            index,
            weights,
            total_weight,
            quorum: quorum_threshold(total_weight, rftt),
            levels: vec![vec![0; n]; n],
            first_level_zero_votes: vec![None; n],
        }
    }

    pub fn last_finalized(&self) -> BlockHash {
        self.last_finalized
    }

    pub fn index(&self) -> &ValidatorIndex {
        &self.index
    }

    pub fn num_validators(&self) -> usize {
        self.index.len()
    }

    pub fn weight(&self, slot: usize) -> Weight {
        self.weights[slot]
    }

    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    pub fn quorum(&self) -> Weight {
        self.quorum
    }

    pub fn level(&self, observer: usize, observed: usize) -> u64 {
        self.levels[observer][observed]
    }

    pub fn row(&self, observer: usize) -> &[u64] {
        &self.levels[observer]
    }

    /// Replace an observer's whole row with a freshly computed panorama.
    pub fn set_row(&mut self, observer: usize, row: Vec<u64>) {
        debug_assert_eq!(row.len(), self.index.len());
        self.levels[observer] = row;
    }

    pub fn first_level_zero_vote(&self, slot: usize) -> Option<Vote> {
        self.first_level_zero_votes[slot]
    }

    /// Record a first-level-zero vote. The slot keeps its earliest vote for
    /// the current value; only a switch to a different consensus value
    /// resets it.
    pub fn record_first_level_zero_vote(
        &mut self,
        slot: usize,
        consensus_value: BlockHash,
        dag_level: u64,
    ) {
        match self.first_level_zero_votes[slot] {
            Some(vote) if vote.consensus_value == consensus_value => {}
            _ => self.first_level_zero_votes[slot] = Some(Vote::new(consensus_value, dag_level)),
        }
    }
}
