//! # Cold-Start Recovery
//!
//! Rebuilds the canonical chain and confirmed state from storage by
//! replaying every stored block from genesis with full validation.
//!
//! The newest checkpoint anchors the replay:
//!
//! - A missing, unreadable or invalid block at or below the anchor is fatal.
//! - The same failure above the anchor truncates the chain to the last good
//!   block and deletes what follows.
//! - The replayed digests at the anchor height must match the checkpoint.
//! - A checkpoint naming a different block than the one stored at its height
//!   belongs to an abandoned fork and is discarded before anchoring.

use crate::domain::{BlockValidator, ChainSnapshot};
use crate::error::{ChainError, ChainResult};
use lc_02_block_storage::ChainStore;
use lc_04_state_management::StateManager;
use shared_types::{Block, Timestamp};

pub(crate) struct Recovered {
    pub chain: Vec<Block>,
    pub state: StateManager,
}

pub(crate) fn recover_chain(
    store: &ChainStore,
    genesis: &Block,
    validator: &BlockValidator,
    retention: usize,
    now: Timestamp,
) -> ChainResult<Recovered> {
    let mut state = StateManager::new(retention);
    let heights = store.block_heights()?;

    let Some(&top) = heights.last() else {
        state.apply_block(genesis)?;
        store.put_block(genesis)?;
        store.put_checkpoint(0, &ChainSnapshot::capture(&state))?;
        tracing::info!("[lc-08] initialized new chain at genesis");
        return Ok(Recovered {
            chain: vec![genesis.clone()],
            state,
        });
    };

    let checkpoint = newest_checkpoint_on_chain(store)?;
    let anchor = checkpoint.as_ref().map_or(0, |c| c.height);

    let mut chain: Vec<Block> = Vec::with_capacity(top as usize + 1);
    let mut truncate_from = None;
    for height in 0..=top.max(anchor) {
        if let Err(reason) = replay_one(store, genesis, validator, &mut state, &mut chain, height, now) {
            if height <= anchor {
                return Err(ChainError::Recovery(format!(
                    "block {height} at or below checkpoint {anchor}: {reason}"
                )));
            }
            tracing::warn!(
                "[lc-08] truncating chain at block {}: {}",
                height,
                reason
            );
            truncate_from = Some(height);
            break;
        }

        if let Some(cp) = checkpoint.as_ref().filter(|c| c.height == height) {
            if let Some(block) = chain.last() {
                if !cp.matches(&state, block) {
                    return Err(ChainError::Recovery(format!(
                        "replayed state at height {height} disagrees with checkpoint"
                    )));
                }
            }
        }
    }

    if let Some(height) = truncate_from {
        let keep = height - 1;
        let dropped = store.delete_blocks_above(keep)?;
        store.delete_checkpoints_above(keep)?;
        tracing::warn!("[lc-08] dropped {} stored blocks above {}", dropped, keep);
    }

    tracing::info!(
        "[lc-08] recovered {} blocks, tip {}",
        chain.len(),
        shared_types::short_hex(&state.tip_hash())
    );
    Ok(Recovered { chain, state })
}

/// Newest checkpoint whose tip is the block stored at its height.
///
/// Only a readable block with another hash disqualifies a checkpoint; a
/// missing or corrupt block is left for the replay to report.
fn newest_checkpoint_on_chain(store: &ChainStore) -> ChainResult<Option<ChainSnapshot>> {
    for height in store.checkpoint_heights()?.into_iter().rev() {
        let Some(checkpoint) = store.load_checkpoint::<ChainSnapshot>(height)? else {
            continue;
        };
        match store.load_block(height) {
            Ok(Some(block)) if block.hash() != checkpoint.tip_hash => {
                tracing::warn!(
                    "[lc-08] discarding checkpoint {} for abandoned block {}",
                    height,
                    shared_types::short_hex(&checkpoint.tip_hash)
                );
                store.delete_checkpoints_above(height.saturating_sub(1))?;
            }
            _ => return Ok(Some(checkpoint)),
        }
    }
    Ok(None)
}

fn replay_one(
    store: &ChainStore,
    genesis: &Block,
    validator: &BlockValidator,
    state: &mut StateManager,
    chain: &mut Vec<Block>,
    height: u64,
    now: Timestamp,
) -> Result<(), String> {
    let block = match store.load_block(height) {
        Ok(Some(block)) => block,
        Ok(None) => return Err("missing".into()),
        Err(e) => return Err(e.to_string()),
    };

    match chain.last() {
        None => {
            if block.hash() != genesis.hash() {
                return Err("genesis does not match configuration".into());
            }
        }
        Some(parent) => validator
            .check_block(&block, &parent.header, now)
            .map_err(|e| e.to_string())?,
    }
    state.apply_block(&block).map_err(|e| e.to_string())?;
    chain.push(block);
    Ok(())
}
