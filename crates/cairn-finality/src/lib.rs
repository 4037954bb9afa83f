//! Finality detection for the CAIRN block DAG.
//!
//! As blocks arrive into the justification DAG, the detector decides
//! whether some child of the last finalized block has gathered enough
//! weighted validator support to be declared irreversible. Support is
//! tracked in a voting matrix: for every pair of bonded validators, how
//! deep one validator's latest message observes the other's history, next
//! to each validator's first message committing to the candidate branch. A
//! candidate finalizes when a quorum-weight subset of its supporters each
//! observe quorum weight of such commitments — the fixed point computed by
//! the committee search.
//!
//! The crate has no storage of its own: it reads blocks through the
//! [`DagView`] contract and keeps one mutex-guarded round state that is
//! rebuilt whenever a block finalizes.

pub mod committee;
pub mod dag;
pub mod detector;
pub mod error;
pub mod finalizer;
pub mod matrix;
pub mod panorama;

#[cfg(test)]
pub(crate) mod testutil;

pub use committee::{find_committee, CommitteeWithConsensusValue};
pub use dag::{DagView, InMemoryDag};
pub use detector::FinalityDetector;
pub use error::FinalityError;
pub use finalizer::Finalizer;
pub use matrix::{ValidatorIndex, VotingMatrix};
pub use panorama::panorama_dag_levels;
