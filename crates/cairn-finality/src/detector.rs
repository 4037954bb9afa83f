//! The finality detector: decides, block by block, whether a child of the
//! last finalized block has gathered an irreversible quorum.
//!
//! One detector instance serves one chain. All state lives in a single
//! [`VotingMatrix`] guarded by one mutex; every call to
//! [`FinalityDetector::on_new_block`] runs in strict mutual exclusion,
//! holding the lock across its DAG reads so that the matrix it observes is
//! the matrix it updates.

use parking_lot::Mutex;
use tracing::{debug, info};

use cairn_types::{BlockHash, BlockMetadata};

use crate::committee::{find_committee, CommitteeWithConsensusValue};
use crate::dag::DagView;
use crate::error::FinalityError;
use crate::matrix::VotingMatrix;
use crate::panorama::panorama_dag_levels;

/// Detector for one finalization round after another.
pub struct FinalityDetector {
    rftt: f64,
    state: Mutex<VotingMatrix>,
}

impl FinalityDetector {
    /// Create a detector rooted at `initial_lfb`.
    ///
    /// `rftt` is the relative fault tolerance threshold and must lie in the
    /// open interval `(0, 0.5)`; anything else fails loudly here. The
    /// initial round state is rebuilt from the DAG's latest messages.
    pub fn new<D: DagView + ?Sized>(
        dag: &D,
        initial_lfb: BlockHash,
        rftt: f64,
    ) -> Result<Self, FinalityError> {
        if !(rftt > 0.0 && rftt < 0.5) {
            return Err(FinalityError::ThresholdOutOfRange(rftt));
        }
        let state = rebuild(dag, initial_lfb, rftt)?;
        Ok(Self {
            rftt,
            state: Mutex::new(state),
        })
    }

    /// Process one newly added block.
    ///
    /// Returns the finalized committee when the block's arrival tips some
    /// child of `current_lfb` over the quorum, `None` otherwise. On
    /// finalization the round state is rebuilt for the new last finalized
    /// block before the result is returned, so a caller that observes the
    /// result always observes the rebuilt state as well.
    pub fn on_new_block<D: DagView + ?Sized>(
        &self,
        dag: &D,
        block: &BlockMetadata,
        current_lfb: &BlockHash,
    ) -> Result<Option<CommitteeWithConsensusValue>, FinalityError> {
        let mut state = self.state.lock();

        let Some(branch) = dag.voted_branch(current_lfb, &block.hash)? else {
            info!(
                block = %block.hash,
                lfb = %current_lfb,
                "block votes on no child of the last finalized block"
            );
            return Ok(None);
        };

        match state.index().slot_of(&block.creator) {
            Some(slot) => {
                let row = panorama_dag_levels(dag, block, state.index())?;
                state.set_row(slot, row);
                state.record_first_level_zero_vote(slot, branch, block.rank);
            }
            None => {
                // Creator bonded after the last finalized block: nothing to
                // update, but the committee check still runs.
                info!(
                    block = %block.hash,
                    creator = %block.creator,
                    "block creator not bonded at the last finalized block"
                );
            }
        }

        let result = find_committee(&state, &branch);
        if let Some(finalized) = &result {
            info!(
                block = %finalized.consensus_value,
                weight = finalized.weight,
                committee_size = finalized.committee.len(),
                "block finalized"
            );
            *state = rebuild(dag, finalized.consensus_value, self.rftt)?;
        }
        Ok(result)
    }
}

/// Build the round state for a new last finalized block.
///
/// The weight map is read from the LFB's post-state; every bonded
/// validator's latest message is classified by the branch it votes on, its
/// first-level-zero vote is taken from the earliest message of its current
/// agreeing run, and its matrix row is recomputed from its latest message's
/// panorama. Validators voting on no child of the LFB are left untouched.
fn rebuild<D: DagView + ?Sized>(
    dag: &D,
    lfb: BlockHash,
    rftt: f64,
) -> Result<VotingMatrix, FinalityError> {
    let lfb_meta = dag.lookup(&lfb)?;
    let mut state = VotingMatrix::new(lfb, &lfb_meta.weight_map, rftt);
    debug!(
        lfb = %lfb,
        validators = state.num_validators(),
        total_weight = lfb_meta.total_weight(),
        quorum = state.quorum(),
        "voting matrix rebuilt"
    );

    for (validator, latest) in dag.latest_messages()? {
        let Some(slot) = state.index().slot_of(&validator) else {
            continue;
        };
        let Some(vote_value) = dag.voted_branch(&lfb, &latest.hash)? else {
            continue;
        };
        let run = dag.level_zero_messages(&validator, &vote_value)?;
        let Some(earliest) = run.first() else {
            continue;
        };
        state.record_first_level_zero_vote(slot, vote_value, earliest.rank);
        let row = panorama_dag_levels(dag, &latest, state.index())?;
        state.set_row(slot, row);
    }
    Ok(state)
}
