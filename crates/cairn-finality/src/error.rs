use cairn_types::BlockHash;
use thiserror::Error;

/// Errors that can occur in finality detection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FinalityError {
    #[error("Relative fault tolerance threshold must lie in (0, 0.5), got {0}")]
    ThresholdOutOfRange(f64),

    #[error("Block not found in DAG: {0}")]
    BlockNotFound(BlockHash),

    #[error("Duplicate block: {0}")]
    DuplicateBlock(BlockHash),

    #[error("Block {block} has unknown main parent {parent}")]
    MissingParent { block: BlockHash, parent: BlockHash },

    #[error("Block {block} has unknown justification {justification}")]
    MissingJustification { block: BlockHash, justification: BlockHash },
}
