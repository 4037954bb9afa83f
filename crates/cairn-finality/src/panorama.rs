//! Panorama computation: how deep a block's justification cone reaches into
//! every validator's message history.

use std::collections::{HashSet, VecDeque};

use cairn_types::BlockMetadata;

use crate::dag::DagView;
use crate::error::FinalityError;
use crate::matrix::ValidatorIndex;

/// For each validator in `index`, the maximum rank among that validator's
/// messages reachable through `block`'s justifications, `block` itself
/// included. Validators outside the index contribute nothing.
///
/// Breadth-first over justification edges with a visited set, so the cost
/// is linear in the number of distinct messages in the cone.
pub fn panorama_dag_levels<D: DagView + ?Sized>(
    dag: &D,
    block: &BlockMetadata,
    index: &ValidatorIndex,
) -> Result<Vec<u64>, FinalityError> {
    let mut levels = vec![0u64; index.len()];
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    visited.insert(block.hash);
    queue.push_back(block.clone());

    while let Some(message) = queue.pop_front() {
        if let Some(slot) = index.slot_of(&message.creator) {
            if message.rank > levels[slot] {
                levels[slot] = message.rank;
            }
        }
        for justification in &message.justifications {
            if visited.insert(*justification) {
                queue.push_back(dag.lookup(justification)?);
            }
        }
    }
    Ok(levels)
}
