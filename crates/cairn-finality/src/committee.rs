//! Committee search: the pruning fixed point over the voting matrix.

use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::{debug, trace};

use cairn_types::{BlockHash, ValidatorId, Weight};

use crate::matrix::VotingMatrix;

/// A quorum of validators committed to finalizing one consensus value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitteeWithConsensusValue {
    /// The child of the last finalized block being finalized
    pub consensus_value: BlockHash,
    /// The validators whose mutual observations clear the quorum
    pub committee: BTreeSet<ValidatorId>,
    /// Combined weight of the committee
    pub weight: Weight,
}

/// Search for a stable committee finalizing `candidate`.
///
/// Starts from the validators whose first-level-zero vote is for
/// `candidate` and repeatedly prunes every validator that cannot observe a
/// quorum of first-level-zero votes among the remaining ones. All removals
/// of a pass happen together, so the resulting fixed point does not depend
/// on the order validators are visited in.
///
/// Returns `None` when no subset of supporters clears the quorum.
pub fn find_committee(
    state: &VotingMatrix,
    candidate: &BlockHash,
) -> Option<CommitteeWithConsensusValue> {
    let n = state.num_validators();
    let quorum = state.quorum();

    let mut mask: Vec<bool> = (0..n).map(|slot| supports(state, slot, candidate)).collect();
    let mut mask_weight: Weight = mask
        .iter()
        .positions(|&included| included)
        .map(|slot| state.weight(slot))
        .sum();

    if mask_weight == 0 {
        return None;
    }
    if mask_weight < quorum {
        debug!(
            candidate = %candidate,
            weight = mask_weight,
            quorum,
            "supporters below quorum"
        );
        return None;
    }

    loop {
        let mut keep = vec![false; n];
        let mut keep_weight: Weight = 0;
        let mut pruned = false;

        for observer in 0..n {
            if !mask[observer] {
                continue;
            }
            let observed: Weight = (0..n)
                .filter(|&voter| mask[voter])
                .filter(|&voter| {
                    match state.first_level_zero_vote(voter) {
                        Some(vote) => {
                            vote.consensus_value == *candidate
                                && vote.dag_level <= state.level(observer, voter)
                        }
                        None => false,
                    }
                })
                .map(|voter| state.weight(voter))
                .sum();

            if observed >= quorum {
                keep[observer] = true;
                keep_weight += state.weight(observer);
            } else {
                pruned = true;
            }
        }

        if !pruned {
            let committee: BTreeSet<ValidatorId> = mask
                .iter()
                .positions(|&included| included)
                .map(|slot| state.index().id_at(slot))
                .collect();
            return Some(CommitteeWithConsensusValue {
                consensus_value: *candidate,
                committee,
                weight: mask_weight,
            });
        }

        trace!(
            candidate = %candidate,
            remaining = keep_weight,
            "pruning pass removed validators"
        );
        if keep_weight < quorum {
            return None;
        }
        mask = keep;
        mask_weight = keep_weight;
    }
}

fn supports(state: &VotingMatrix, slot: usize, candidate: &BlockHash) -> bool {
    matches!(
        state.first_level_zero_vote(slot),
        Some(vote) if vote.consensus_value == *candidate
    )
}
