//! Finalizer loop: drives the detector from the node's block stream.
//!
//! The loop owns the current last finalized block. Each block hash received
//! on the inbound channel is looked up, run through the detector, and, when
//! it tips a child of the LFB over the quorum, the finalized record is
//! published on the outbound channel and the LFB advances.
//!
//! ## Shutdown
//!
//! The loop watches a `tokio::sync::watch` channel. When the sender flips
//! it to `true` or drops, the loop exits after finishing the block it is
//! currently processing; no half-applied round is ever left behind. Closing
//! the block channel ends the loop the same way.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use cairn_types::BlockHash;

use crate::committee::CommitteeWithConsensusValue;
use crate::dag::DagView;
use crate::detector::FinalityDetector;
use crate::error::FinalityError;

/// Drives a [`FinalityDetector`] from a stream of newly added block hashes.
pub struct Finalizer<D> {
    dag: Arc<D>,
    detector: FinalityDetector,
    last_finalized: BlockHash,
    finalized_tx: mpsc::Sender<CommitteeWithConsensusValue>,
}

impl<D: DagView> Finalizer<D> {
    /// Create a finalizer rooted at `initial_lfb`. Fails when `rftt` is out
    /// of range or the initial rebuild hits a missing block.
    pub fn new(
        dag: Arc<D>,
        initial_lfb: BlockHash,
        rftt: f64,
        finalized_tx: mpsc::Sender<CommitteeWithConsensusValue>,
    ) -> Result<Self, FinalityError> {
        let detector = FinalityDetector::new(dag.as_ref(), initial_lfb, rftt)?;
        Ok(Self {
            dag,
            detector,
            last_finalized: initial_lfb,
            finalized_tx,
        })
    }

    /// The deepest block declared irreversible so far.
    pub fn last_finalized(&self) -> BlockHash {
        self.last_finalized
    }

    /// Run until shutdown is signalled or the block stream closes.
    ///
    /// DAG errors abort the loop: the store is authoritative, and a hash it
    /// cannot resolve means the caller fed the finalizer a block that was
    /// never added.
    pub async fn run(
        mut self,
        mut blocks: mpsc::Receiver<BlockHash>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), FinalityError> {
        info!(lfb = %self.last_finalized, "finalizer started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = blocks.recv() => {
                    match received {
                        Some(hash) => self.process(hash).await?,
                        None => break,
                    }
                }
            }
        }
        info!(lfb = %self.last_finalized, "finalizer stopped");
        Ok(())
    }

    async fn process(&mut self, hash: BlockHash) -> Result<(), FinalityError> {
        let block = self.dag.lookup(&hash)?;
        let result = self
            .detector
            .on_new_block(self.dag.as_ref(), &block, &self.last_finalized)?;

        if let Some(finalized) = result {
            self.last_finalized = finalized.consensus_value;
            if self.finalized_tx.send(finalized).await.is_err() {
                warn!("finalized-block receiver dropped; record not delivered");
            }
        }
        Ok(())
    }
}
